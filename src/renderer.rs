// Bridge to the external diagram renderer.
//
// Every render spawns a fresh renderer process as `<program> [args..] - <output>`, feeds the
// diagram through stdin and reads the image the renderer leaves in a temporary file.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStderr, ChildStdin, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

// The renderer picks its output format from the file extension.
const OUTPUT_PREFIX: &str = "d2-";
const OUTPUT_SUFFIX: &str = ".png";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("empty diagram")]
    EmptyDiagram,

    #[error("failed to allocate output file: {0}")]
    TempFile(#[source] io::Error),

    #[error("failed to start renderer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("renderer stdin is not available")]
    StdinUnavailable,

    #[error("renderer stderr is not available")]
    StderrUnavailable,

    #[error("failed to send diagram to renderer: {0}")]
    WriteInput(#[source] io::Error),

    #[error("renderer input writer stopped without reporting")]
    WriterLost,

    #[error("failed to wait for renderer: {0}")]
    Wait(#[source] io::Error),

    #[error("renderer exited with {status}: {stderr}")]
    Exited { status: ExitStatus, stderr: String },

    #[error("failed to read renderer output: {0}")]
    ReadOutput(#[source] io::Error),

    #[error("renderer produced no output")]
    EmptyOutput,

    #[error("renderer did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Launch settings for the renderer executable. Cheap to clone; holds no process state.
#[derive(Debug, Clone)]
pub struct Renderer {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl Renderer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Extra arguments placed before the `-` input marker.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Bounds both the stdin write and the wait for the renderer to exit.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Render `diagram` and return the bytes of the produced file.
    ///
    /// The diagram is handed over byte for byte; it does not have to be valid UTF-8.
    /// The output file is removed and the renderer process killed on every return path,
    /// including when the returned future is dropped mid-flight.
    pub async fn render(&self, diagram: impl AsRef<[u8]>) -> Result<Vec<u8>, RenderError> {
        let diagram = diagram.as_ref();
        if diagram.is_empty() {
            return Err(RenderError::EmptyDiagram);
        }

        let output = tempfile::Builder::new()
            .prefix(OUTPUT_PREFIX)
            .suffix(OUTPUT_SUFFIX)
            .tempfile()
            .map_err(RenderError::TempFile)?
            .into_temp_path();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("-")
            .arg(&*output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        debug!(
            pid = child.id(),
            output = %output.display(),
            "Renderer process started"
        );

        // Stderr is drained from the start; a renderer blocked on a full stderr pipe
        // would otherwise never finish reading its input.
        let stderr = child.stderr.take().ok_or(RenderError::StderrUnavailable)?;
        let diagnostics = spawn_stderr_reader(stderr);

        let stdin = child.stdin.take().ok_or(RenderError::StdinUnavailable)?;
        let written = spawn_input_writer(stdin, diagram.to_vec());

        match self.bounded(written).await? {
            Ok(Ok(())) => debug!("Diagram sent to renderer ({} bytes)", diagram.len()),
            Ok(Err(err)) => return Err(RenderError::WriteInput(err)),
            Err(_) => return Err(RenderError::WriterLost),
        }

        let status = self
            .bounded(child.wait())
            .await?
            .map_err(RenderError::Wait)?;

        if !status.success() {
            let captured = self.bounded(diagnostics).await?.unwrap_or_default();
            let stderr = String::from_utf8_lossy(&captured).trim().to_owned();
            warn!("Renderer failed with {}: {}", status, stderr);
            return Err(RenderError::Exited { status, stderr });
        }

        let bytes = tokio::fs::read(&output)
            .await
            .map_err(RenderError::ReadOutput)?;
        if bytes.is_empty() {
            return Err(RenderError::EmptyOutput);
        }

        debug!("Renderer produced {} bytes", bytes.len());
        Ok(bytes)
    }

    async fn bounded<F: Future>(&self, fut: F) -> Result<F::Output, RenderError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| RenderError::TimedOut(limit)),
            None => Ok(fut.await),
        }
    }
}

// Writes the diagram and closes stdin on its own task; the receiver resolves once the
// write outcome is known.
fn spawn_input_writer(
    mut stdin: ChildStdin,
    diagram: Vec<u8>,
) -> oneshot::Receiver<io::Result<()>> {
    let (done_tx, done_rx) = oneshot::channel();

    tokio::spawn(async move {
        let result: io::Result<()> = async {
            stdin.write_all(&diagram).await?;
            stdin.shutdown().await
        }
        .await;
        drop(stdin);

        // The receiver is gone when the request was abandoned.
        let _ = done_tx.send(result);
    });

    done_rx
}

// Collects everything the renderer writes to stderr until the pipe closes.
fn spawn_stderr_reader(mut stderr: ChildStderr) -> JoinHandle<Vec<u8>> {
    tokio::spawn(async move {
        let mut captured = Vec::new();
        if let Err(err) = stderr.read_to_end(&mut captured).await {
            debug!("Stopped reading renderer stderr: {}", err);
        }
        captured
    })
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    /// A renderer that runs `script` through `sh`; the output path arrives as `$2`.
    pub(crate) fn sh_renderer(script: &str) -> Renderer {
        Renderer::new("sh").with_args(vec!["-c".into(), script.into(), "sh".into()])
    }

    /// Copies stdin to the output file, so the rendered bytes equal the diagram text.
    pub(crate) fn echo_renderer() -> Renderer {
        sh_renderer(r#"cat > "$2""#)
    }

    #[tokio::test]
    async fn test_render_returns_output_file_contents() {
        let bytes = assert_ok!(echo_renderer().render("a -> b").await);
        assert_eq!(bytes, b"a -> b");
    }

    #[tokio::test]
    async fn test_render_streams_large_input() {
        let diagram = "node -> other\n".repeat(64 * 1024);
        let bytes = echo_renderer().render(&diagram).await.unwrap();
        assert_eq!(bytes.len(), diagram.len());
    }

    #[tokio::test]
    async fn test_render_passes_input_marker_and_output_path() {
        let renderer = sh_renderer(r#"cat > /dev/null; printf '%s' "$1" > "$2""#);
        let bytes = renderer.render("x").await.unwrap();
        assert_eq!(bytes, b"-");
    }

    #[tokio::test]
    async fn test_render_passes_non_utf8_input_through() {
        let bytes = echo_renderer().render(b"a -> \xff\xfe").await.unwrap();
        assert_eq!(bytes, b"a -> \xff\xfe");
    }

    #[tokio::test]
    async fn test_render_rejects_empty_diagram_without_spawning() {
        let renderer = Renderer::new("/nonexistent/renderer");
        let err = assert_err!(renderer.render("").await);
        assert!(matches!(err, RenderError::EmptyDiagram));
    }

    #[tokio::test]
    async fn test_render_reports_spawn_failure() {
        let renderer = Renderer::new("/nonexistent/renderer");
        let err = renderer.render("a -> b").await.unwrap_err();
        assert!(matches!(err, RenderError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/renderer"));
    }

    #[tokio::test]
    async fn test_render_reports_exit_status_and_stderr() {
        let renderer = sh_renderer("cat > /dev/null; echo 'syntax error on line 1' >&2; exit 3");
        let err = renderer.render("a ->").await.unwrap_err();
        match err {
            RenderError::Exited { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "syntax error on line 1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_render_drains_stderr_while_reading_input() {
        let renderer = sh_renderer(r#"head -c 200000 /dev/zero >&2; cat > "$2"; exit 1"#);
        let diagram = "a -> b\n".repeat(40 * 1024);

        let render = renderer.render(&diagram);
        let result = tokio::time::timeout(Duration::from_secs(5), render).await;
        let err = assert_ok!(result, "render did not finish").unwrap_err();
        match err {
            RenderError::Exited { status, stderr } => {
                assert_eq!(status.code(), Some(1));
                assert_eq!(stderr.len(), 200_000);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_render_rejects_empty_output() {
        let renderer = sh_renderer("cat > /dev/null");
        let err = renderer.render("a -> b").await.unwrap_err();
        assert!(matches!(err, RenderError::EmptyOutput));
    }

    #[tokio::test]
    async fn test_render_reports_missing_output() {
        let renderer = sh_renderer(r#"cat > /dev/null; rm -f "$2""#);
        let err = renderer.render("a -> b").await.unwrap_err();
        assert!(matches!(err, RenderError::ReadOutput(_)));
    }

    #[tokio::test]
    async fn test_render_times_out_on_hung_renderer() {
        let renderer =
            sh_renderer("cat > /dev/null; sleep 5").with_timeout(Some(Duration::from_millis(200)));
        let err = renderer.render("a -> b").await.unwrap_err();
        assert!(matches!(err, RenderError::TimedOut(_)));
    }

    #[tokio::test]
    async fn test_render_removes_output_file() {
        let renderer = sh_renderer(r#"cat > "$2"; printf '%s' "$2" >&2; exit 1"#);
        let err = renderer.render("a -> b").await.unwrap_err();
        let stderr = match err {
            RenderError::Exited { stderr, .. } => stderr,
            other => panic!("unexpected error: {other:?}"),
        };
        assert!(stderr.ends_with(OUTPUT_SUFFIX));
        assert!(!Path::new(&stderr).exists());
    }

    #[tokio::test]
    async fn test_concurrent_renders_are_independent() {
        let renderer = echo_renderer();
        let renders = (0..8).map(|i| {
            let renderer = renderer.clone();
            tokio::spawn(async move { (i, renderer.render(&format!("diagram {i}")).await) })
        });

        for handle in renders {
            let (i, result) = handle.await.unwrap();
            assert_eq!(result.unwrap(), format!("diagram {i}").into_bytes());
        }
    }
}
