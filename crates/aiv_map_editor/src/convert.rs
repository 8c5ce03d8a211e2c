//! External map converter
//!
//! `.aiv` castle files are binary; an external tool converts them to and
//! from the JSON interchange document:
//!
//! ```text
//! <program> [args..] convert aiv --input <in> --output <out>
//! ```
//!
//! Conversions run on a background thread and report a single terminal
//! [`ConvertOutput`] through a channel. A load builds a whole new [`Map`];
//! a save works on an [`AivDocument`] snapshot taken before the job starts.

use aiv_map_core::{AivDocument, Catalog, InterchangeError, Map};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// Program invoked when no converter is configured
pub const DEFAULT_CONVERTER: &str = "sourcehold";

/// How often the worker checks the child process and the cancel signal
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Error type for conversions
#[derive(Debug)]
pub enum ConvertError {
    /// IO error on the intermediate files
    IoError(io::Error),
    /// The converter could not be started or exited unsuccessfully
    ProcessFailed(String),
    /// The converter's JSON did not have the expected shape
    InvalidStructure(String),
    /// The job was cancelled before it finished
    Cancelled,
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertError::IoError(e) => write!(f, "IO error: {}", e),
            ConvertError::ProcessFailed(msg) => write!(f, "Converter failed: {}", msg),
            ConvertError::InvalidStructure(msg) => write!(f, "Invalid map data: {}", msg),
            ConvertError::Cancelled => write!(f, "Conversion cancelled"),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<io::Error> for ConvertError {
    fn from(e: io::Error) -> Self {
        ConvertError::IoError(e)
    }
}

impl From<InterchangeError> for ConvertError {
    fn from(e: InterchangeError) -> Self {
        ConvertError::InvalidStructure(e.to_string())
    }
}

/// Terminal message from a conversion job
#[derive(Debug)]
pub enum ConvertOutput {
    /// A map was imported
    Loaded {
        map: Map,
        /// Frames whose item id is not in the catalog
        skipped_frames: usize,
    },
    /// A map was written
    Saved {
        path: PathBuf,
        /// Instances outside the packable grid
        skipped_instances: usize,
    },
    Failed(ConvertError),
}

/// Handle for an in-flight conversion
pub struct AsyncConvertHandle {
    /// Receiver for the job's result (wrapped in Mutex for Sync)
    pub receiver: Mutex<Receiver<ConvertOutput>>,
    /// Sender to signal cancellation
    pub cancel_sender: Sender<()>,
}

impl AsyncConvertHandle {
    /// Try to receive the result without blocking
    pub fn try_recv(&self) -> Option<ConvertOutput> {
        self.receiver.lock().ok()?.try_recv().ok()
    }

    /// Block up to `timeout` for the result
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ConvertOutput> {
        self.receiver.lock().ok()?.recv_timeout(timeout).ok()
    }

    /// Ask the job to stop. The job still reports [`ConvertError::Cancelled`].
    pub fn cancel(&self) {
        let _ = self.cancel_sender.send(());
    }
}

impl std::fmt::Debug for AsyncConvertHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncConvertHandle").finish_non_exhaustive()
    }
}

/// How to run the external converter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converter {
    program: PathBuf,
    args: Vec<String>,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERTER)
    }
}

impl Converter {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the `convert` subcommand
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Import an `.aiv` file, blocking until done
    pub fn import(
        &self,
        input: &Path,
        catalog: &Catalog,
    ) -> Result<(Map, usize), ConvertError> {
        match self.run_import(input, catalog, None) {
            ConvertOutput::Loaded {
                map,
                skipped_frames,
            } => Ok((map, skipped_frames)),
            ConvertOutput::Failed(e) => Err(e),
            ConvertOutput::Saved { .. } => Err(ConvertError::InvalidStructure(
                "converter reported a save for an import".to_string(),
            )),
        }
    }

    /// Export a document to an `.aiv` file, blocking until done
    pub fn export(&self, document: &AivDocument, output: &Path) -> Result<(), ConvertError> {
        match self.run_export(document, output, 0, None) {
            ConvertOutput::Saved { .. } => Ok(()),
            ConvertOutput::Failed(e) => Err(e),
            ConvertOutput::Loaded { .. } => Err(ConvertError::InvalidStructure(
                "converter reported a load for an export".to_string(),
            )),
        }
    }

    /// Import on a background thread
    pub fn import_async(&self, input: PathBuf, catalog: Arc<Catalog>) -> AsyncConvertHandle {
        let converter = self.clone();
        spawn_job(move |cancel_rx| converter.run_import(&input, &catalog, Some(cancel_rx)))
    }

    /// Export a map snapshot on a background thread
    pub fn export_async(&self, map: &Map, output: PathBuf) -> AsyncConvertHandle {
        let exported = AivDocument::from_map(map);
        let converter = self.clone();
        spawn_job(move |cancel_rx| {
            converter.run_export(
                &exported.document,
                &output,
                exported.skipped_instances,
                Some(cancel_rx),
            )
        })
    }

    fn run_import(
        &self,
        input: &Path,
        catalog: &Catalog,
        cancel_rx: Option<&Receiver<()>>,
    ) -> ConvertOutput {
        let json_path = temp_json_path();
        let result = (|| {
            check_cancelled(cancel_rx)?;
            self.run(input, &json_path, cancel_rx)?;
            let content = std::fs::read_to_string(&json_path)?;
            let document = AivDocument::from_json(&content)?;
            let name = input
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "Untitled".to_string());
            let imported = document.to_map(catalog, name);
            check_cancelled(cancel_rx)?;
            Ok::<_, ConvertError>(imported)
        })();
        let _ = std::fs::remove_file(&json_path);

        match result {
            Ok(imported) => ConvertOutput::Loaded {
                map: imported.map,
                skipped_frames: imported.skipped_frames,
            },
            Err(e) => ConvertOutput::Failed(e),
        }
    }

    fn run_export(
        &self,
        document: &AivDocument,
        output: &Path,
        skipped_instances: usize,
        cancel_rx: Option<&Receiver<()>>,
    ) -> ConvertOutput {
        let json_path = temp_json_path();
        let result = (|| {
            check_cancelled(cancel_rx)?;
            std::fs::write(&json_path, document.to_json_pretty()?)?;
            check_cancelled(cancel_rx)?;
            self.run(&json_path, output, cancel_rx)
        })();
        let _ = std::fs::remove_file(&json_path);

        match result {
            Ok(()) => ConvertOutput::Saved {
                path: output.to_path_buf(),
                skipped_instances,
            },
            Err(e) => ConvertOutput::Failed(e),
        }
    }

    /// Run the converter once and wait for it, killing it on cancellation
    fn run(
        &self,
        input: &Path,
        output: &Path,
        cancel_rx: Option<&Receiver<()>>,
    ) -> Result<(), ConvertError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(["convert", "aiv", "--input"])
            .arg(input)
            .arg("--output")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            ConvertError::ProcessFailed(format!(
                "could not start {}: {}",
                self.program.display(),
                e
            ))
        })?;

        // Collect stderr on its own thread so a chatty converter can't block
        let stderr_handle = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                BufReader::new(stderr)
                    .lines()
                    .map_while(Result::ok)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        });

        loop {
            if check_cancelled(cancel_rx).is_err() {
                stop_child(&mut child);
                return Err(ConvertError::Cancelled);
            }

            let exited = match child.try_wait() {
                Ok(exited) => exited,
                Err(e) => {
                    stop_child(&mut child);
                    return Err(e.into());
                }
            };
            match exited {
                Some(status) => {
                    let stderr = stderr_handle
                        .and_then(|handle| handle.join().ok())
                        .unwrap_or_default();
                    if status.success() {
                        return Ok(());
                    }
                    let mut message = match status.code() {
                        Some(code) => format!("exited with code {}", code),
                        None => "terminated by signal".to_string(),
                    };
                    if !stderr.trim().is_empty() {
                        message.push_str(": ");
                        message.push_str(stderr.trim());
                    }
                    return Err(ConvertError::ProcessFailed(message));
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        }
    }
}

/// Kill the converter and reap it so no zombie is left behind
fn stop_child(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_job<F>(job: F) -> AsyncConvertHandle
where
    F: FnOnce(&Receiver<()>) -> ConvertOutput + Send + 'static,
{
    let (output_tx, output_rx) = mpsc::channel();
    let (cancel_tx, cancel_rx) = mpsc::channel();

    thread::spawn(move || {
        let output = job(&cancel_rx);
        let _ = output_tx.send(output);
    });

    AsyncConvertHandle {
        receiver: Mutex::new(output_rx),
        cancel_sender: cancel_tx,
    }
}

fn check_cancelled(cancel_rx: Option<&Receiver<()>>) -> Result<(), ConvertError> {
    match cancel_rx {
        Some(rx) if rx.try_recv().is_ok() => Err(ConvertError::Cancelled),
        _ => Ok(()),
    }
}

fn temp_json_path() -> PathBuf {
    std::env::temp_dir().join(format!("aiv_map_editor_{}.json", Uuid::new_v4()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use aiv_map_core::{Item, ItemKind, Stroke};

    const TIMEOUT: Duration = Duration::from_secs(10);

    struct TempDir(PathBuf);

    impl TempDir {
        fn new() -> Self {
            let dir = std::env::temp_dir().join(format!("aiv_convert_test_{}", Uuid::new_v4()));
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    /// A converter that runs `body` as a shell script. The script sees the
    /// converter arguments as `$1..$6`.
    fn fake_converter(dir: &TempDir, body: &str) -> Converter {
        let script = dir.0.join("convert.sh");
        std::fs::write(&script, body).unwrap();
        Converter::new("sh").with_args([script.to_string_lossy().to_string()])
    }

    fn catalog() -> Catalog {
        Catalog::from_items([Item::new(1, "Wall", ItemKind::Wall, 1, 1)]).unwrap()
    }

    #[test]
    fn test_stop_child_reaps_process() {
        let mut child = Command::new("sh")
            .args(["-c", "sleep 30"])
            .spawn()
            .unwrap();
        stop_child(&mut child);
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_import() {
        let dir = TempDir::new();
        let converter = fake_converter(
            &dir,
            r#"[ "$1 $2 $3 $5" = "convert aiv --input --output" ] || exit 9
cat > "$6" <<'EOF'
{"frames": [{"itemType": 1, "tilePositionOfsets": [0, 101], "shouldPause": false},
            {"itemType": 2, "tilePositionOfsets": [5], "shouldPause": false}],
 "miscItems": [], "pauseDelayAmount": 500}
EOF
"#,
        );

        let (map, skipped) = converter
            .import(&dir.0.join("castle.aiv"), &catalog())
            .unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(map.name, "castle");
        assert_eq!(map.stroke_count(), 1);
        assert_eq!(map.strokes()[0].len(), 2);
        assert_eq!(map.pause_delay_amount, 500);
    }

    #[test]
    fn test_export_async() {
        let dir = TempDir::new();
        // Pretend the .aiv format is the JSON itself
        let converter = fake_converter(&dir, "cp \"$4\" \"$6\"\n");

        let wall = catalog().get(1).cloned().unwrap();
        let mut map = Map::new("Keep", 100, 100);
        let mut stroke = Stroke::new(wall);
        stroke.add_instance((3, 2));
        map.append_stroke(stroke);

        let output = dir.0.join("keep.aiv");
        let handle = converter.export_async(&map, output.clone());
        match handle.recv_timeout(TIMEOUT) {
            Some(ConvertOutput::Saved {
                path,
                skipped_instances,
            }) => {
                assert_eq!(path, output);
                assert_eq!(skipped_instances, 0);
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let written = std::fs::read_to_string(&output).unwrap();
        let document = AivDocument::from_json(&written).unwrap();
        assert_eq!(document.frames[0].tile_position_offsets, vec![203]);
    }

    #[test]
    fn test_process_failure() {
        let dir = TempDir::new();
        let converter = fake_converter(&dir, "echo 'bad castle' >&2\nexit 3\n");

        let result = converter.import(&dir.0.join("castle.aiv"), &catalog());
        match result {
            Err(ConvertError::ProcessFailed(message)) => {
                assert!(message.contains("code 3"));
                assert!(message.contains("bad castle"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_structure() {
        let dir = TempDir::new();
        let converter = fake_converter(&dir, "echo '{\"frames\": 5}' > \"$6\"\n");

        let result = converter.import(&dir.0.join("castle.aiv"), &catalog());
        assert!(matches!(result, Err(ConvertError::InvalidStructure(_))));
    }

    #[test]
    fn test_missing_program() {
        let converter = Converter::new(format!("/nonexistent/{}", Uuid::new_v4()));
        let result = converter.import(Path::new("castle.aiv"), &catalog());
        assert!(matches!(result, Err(ConvertError::ProcessFailed(_))));
    }

    #[test]
    fn test_cancel() {
        let dir = TempDir::new();
        let converter = fake_converter(&dir, "sleep 5\n");

        let handle = converter.import_async(dir.0.join("castle.aiv"), Arc::new(catalog()));
        handle.cancel();
        match handle.recv_timeout(TIMEOUT) {
            Some(ConvertOutput::Failed(ConvertError::Cancelled)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
