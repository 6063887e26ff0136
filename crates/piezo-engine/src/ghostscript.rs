//! Ghostscript binary discovery and per-session invocation.

use std::env;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

use tempfile::TempDir;

use crate::{Engine, EngineError, EngineSession};

/// Environment variables consulted when no explicit binary override is given.
const BINARY_ENV_VARS: &[&str] = &["PIEZO_GS_BINARY", "GHOSTSCRIPT_BINARY"];

/// Well-known binary names probed through `PATH` as a last resort.
const BINARY_CANDIDATES: &[&str] = &["gs", "gswin64c", "gswin32c"];

/// A resolved Ghostscript installation.
///
/// Cheap to clone; sessions are opened per job via [`Engine::open_session`].
#[derive(Debug, Clone)]
pub struct Ghostscript {
    binary: PathBuf,
    version: String,
}

impl Ghostscript {
    /// Resolve a usable Ghostscript binary.
    ///
    /// Resolution order: the explicit `override_path`, then the
    /// `PIEZO_GS_BINARY` / `GHOSTSCRIPT_BINARY` environment variables, then
    /// well-known binary names on `PATH`. Each candidate is probed with
    /// `--version`; the first one that answers wins.
    pub fn locate(override_path: Option<&Path>) -> Result<Self, EngineError> {
        // An explicit override is authoritative: a broken one fails loudly
        // instead of silently picking a different installation.
        if let Some(path) = override_path {
            return match probe(path) {
                Some(version) => Ok(Self {
                    binary: path.to_path_buf(),
                    version,
                }),
                None => Err(EngineError::BinaryNotFound {
                    tried: path.display().to_string(),
                }),
            };
        }

        let mut candidates: Vec<PathBuf> = Vec::new();
        for var in BINARY_ENV_VARS {
            if let Some(value) = env::var_os(var) {
                candidates.push(PathBuf::from(value));
            }
        }
        candidates.extend(BINARY_CANDIDATES.iter().copied().map(PathBuf::from));

        for candidate in &candidates {
            if let Some(version) = probe(candidate) {
                tracing::debug!(binary = %candidate.display(), %version, "resolved engine binary");
                return Ok(Self {
                    binary: candidate.clone(),
                    version,
                });
            }
        }

        let tried = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(EngineError::BinaryNotFound { tried })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Ask a candidate binary for its version string.
fn probe(path: &Path) -> Option<String> {
    let output = Command::new(path)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = stdout.lines().next().unwrap_or("").trim().to_string();
    if version.is_empty() { None } else { Some(version) }
}

impl Engine for Ghostscript {
    type Session = GhostscriptSession;

    fn open_session(&self) -> Result<GhostscriptSession, EngineError> {
        let scratch = TempDir::with_prefix("piezo-gs-").map_err(EngineError::Scratch)?;
        tracing::debug!(scratch = %scratch.path().display(), "opened engine session");
        Ok(GhostscriptSession {
            binary: self.binary.clone(),
            scratch,
        })
    }

    fn describe(&self) -> String {
        format!("Ghostscript {} ({})", self.version, self.binary.display())
    }
}

/// A single-use Ghostscript invocation context.
///
/// The scratch directory is the session's private filesystem; it is removed
/// when the session is dropped.
pub struct GhostscriptSession {
    binary: PathBuf,
    scratch: TempDir,
}

impl EngineSession for GhostscriptSession {
    fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), EngineError> {
        fs::write(self.scratch.path().join(name), bytes).map_err(|source| EngineError::Write {
            name: name.to_string(),
            source,
        })
    }

    fn read_file(&mut self, name: &str) -> Result<Vec<u8>, EngineError> {
        fs::read(self.scratch.path().join(name)).map_err(|source| EngineError::Read {
            name: name.to_string(),
            source,
        })
    }

    fn remove_file(&mut self, name: &str) -> Result<(), EngineError> {
        match fs::remove_file(self.scratch.path().join(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(EngineError::Remove {
                name: name.to_string(),
                source,
            }),
        }
    }

    fn file_path(&self, name: &str) -> String {
        self.scratch.path().join(name).to_string_lossy().into_owned()
    }

    fn run(&mut self, args: &[String], on_line: &mut dyn FnMut(&str)) -> Result<(), EngineError> {
        tracing::debug!(binary = %self.binary.display(), ?args, "invoking engine");

        let mut child = Command::new(&self.binary)
            .args(args)
            .current_dir(self.scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(EngineError::Spawn)?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // The engine writes page logs to stdout and diagnostics to stderr,
        // but not reliably; both streams feed the same sink. Reader threads
        // drain the pipes so neither side can block the child.
        let (tx, rx) = mpsc::channel::<String>();
        thread::scope(|scope| {
            if let Some(out) = stdout {
                let tx = tx.clone();
                scope.spawn(move || forward_lines(out, &tx));
            }
            if let Some(err) = stderr {
                let tx = tx.clone();
                scope.spawn(move || forward_lines(err, &tx));
            }
            drop(tx);
            for line in rx {
                on_line(&line);
            }
        });

        let status = child.wait()?;
        if !status.success() {
            return Err(EngineError::Failed {
                detail: status.to_string(),
            });
        }
        Ok(())
    }
}

fn forward_lines(reader: impl Read, tx: &mpsc::Sender<String>) {
    for line in BufReader::new(reader).lines() {
        match line {
            Ok(line) => {
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_session() -> GhostscriptSession {
        GhostscriptSession {
            binary: PathBuf::from("unused"),
            scratch: TempDir::new().expect("scratch dir"),
        }
    }

    #[test]
    fn session_filesystem_roundtrip() {
        let mut session = scratch_session();

        session.write_file("in.pdf", b"%PDF-1.4 data").expect("write");
        let back = session.read_file("in.pdf").expect("read");
        assert_eq!(back, b"%PDF-1.4 data");

        session.remove_file("in.pdf").expect("remove");
        assert!(matches!(
            session.read_file("in.pdf"),
            Err(EngineError::Read { .. })
        ));
    }

    #[test]
    fn removing_a_missing_file_is_not_an_error() {
        let mut session = scratch_session();
        session.remove_file("out.pdf").expect("remove of absent file");
    }

    #[test]
    fn file_path_points_into_the_scratch_dir() {
        let session = scratch_session();
        let path = session.file_path("out.pdf");
        assert!(path.ends_with("out.pdf"));
        assert!(path.starts_with(&session.scratch.path().to_string_lossy().into_owned()));
    }

    #[test]
    fn locate_with_bogus_override_fails() {
        let missing = Path::new("/nonexistent/piezo-test-gs");
        let err = Ghostscript::locate(Some(missing)).expect_err("must not resolve");
        assert!(matches!(err, EngineError::BinaryNotFound { .. }));
    }

    #[cfg(unix)]
    fn fake_engine_script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-gs");
        fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
        let mut perms = fs::metadata(&path).expect("stat").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[cfg(unix)]
    #[test]
    fn locate_probes_with_version_flag() {
        let dir = TempDir::new().expect("dir");
        let script = fake_engine_script(dir.path(), "echo 10.02.1\n");

        let engine = Ghostscript::locate(Some(&script)).expect("locate");
        assert_eq!(engine.version(), "10.02.1");
        assert!(engine.describe().contains("10.02.1"));
    }

    #[cfg(unix)]
    #[test]
    fn run_forwards_both_streams_line_by_line() {
        let dir = TempDir::new().expect("dir");
        let script = fake_engine_script(
            dir.path(),
            "echo 'Processing pages 1 through 2.'\n\
             echo 'Page 1'\n\
             echo 'diagnostic noise' 1>&2\n\
             echo 'Page 2'\n",
        );

        let engine = Ghostscript::locate(Some(&script)).expect("locate");
        let mut session = engine.open_session().expect("session");

        let mut lines = Vec::new();
        session
            .run(&[], &mut |line| lines.push(line.to_string()))
            .expect("run");

        // Arrival order across the two pipes is not deterministic; presence
        // and per-stream ordering are.
        assert!(lines.contains(&"Processing pages 1 through 2.".to_string()));
        assert!(lines.contains(&"diagnostic noise".to_string()));
        let page1 = lines.iter().position(|l| l == "Page 1").expect("page 1");
        let page2 = lines.iter().position(|l| l == "Page 2").expect("page 2");
        assert!(page1 < page2);
    }

    #[cfg(unix)]
    #[test]
    fn abnormal_exit_surfaces_as_failed() {
        let dir = TempDir::new().expect("dir");
        let script = fake_engine_script(dir.path(), "echo 10.0\n[ \"$1\" = --version ] && exit 0\nexit 3\n");

        let engine = Ghostscript::locate(Some(&script)).expect("locate");
        let mut session = engine.open_session().expect("session");

        let err = session.run(&["boom".to_string()], &mut |_| {}).expect_err("must fail");
        assert!(matches!(err, EngineError::Failed { .. }));
    }
}
