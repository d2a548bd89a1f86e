use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use barywire_base::{Error, Result};
use tracing::debug;

use crate::buf::{BufMesh, load_buf};

/// Reads and decodes buf files off the render thread.
pub struct MeshLoader;

impl MeshLoader {
    pub fn spawn(path: impl Into<PathBuf>) -> Result<PendingMesh> {
        let path = path.into();
        let (sender, receiver) = mpsc::sync_channel(1);
        let worker_path = path.clone();
        thread::Builder::new()
            .name("barywire-loader".to_string())
            .spawn(move || {
                let result = load_buf(&worker_path);
                // The receiver may be gone if the load was abandoned.
                let _ = sender.send(result);
            })?;
        debug!(path = %path.display(), "mesh load started");
        Ok(PendingMesh {
            path,
            receiver: Some(receiver),
        })
    }
}

/// Single-shot completion handle for a background load.
///
/// `poll` yields the result exactly once; dropping the handle abandons the
/// load.
pub struct PendingMesh {
    path: PathBuf,
    receiver: Option<mpsc::Receiver<Result<BufMesh>>>,
}

impl PendingMesh {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.receiver.is_none()
    }

    /// Non-blocking; call once per frame.
    pub fn poll(&mut self) -> Option<Result<BufMesh>> {
        let receiver = self.receiver.as_ref()?;
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => Err(self.worker_gone()),
        };
        self.receiver = None;
        Some(result)
    }

    /// Blocks until the worker finishes.
    pub fn wait(mut self) -> Result<BufMesh> {
        match self.receiver.take() {
            Some(receiver) => receiver.recv().unwrap_or_else(|_| Err(self.worker_gone())),
            None => Err(Error::ResourceLoad {
                path: self.path.display().to_string(),
                reason: "result was already taken".to_string(),
            }),
        }
    }

    fn worker_gone(&self) -> Error {
        Error::ResourceLoad {
            path: self.path.display().to_string(),
            reason: "loader thread exited without a result".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        let stamp = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(duration) => duration.as_nanos(),
            Err(_) => 0,
        };
        path.push(format!("barywire_{stamp}_{file_name}"));
        path
    }

    fn poll_until_done(pending: &mut PendingMesh) -> Option<Result<BufMesh>> {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if let Some(result) = pending.poll() {
                return Some(result);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn missing_file_reports_resource_load() -> Result<()> {
        let mut pending = MeshLoader::spawn(temp_path("missing.buf"))?;
        let result = poll_until_done(&mut pending).expect("loader finished");
        assert!(matches!(result, Err(Error::ResourceLoad { .. })));
        Ok(())
    }

    #[test]
    fn result_is_delivered_once() -> Result<()> {
        let path = temp_path("tri.buf");
        std::fs::write(
            &path,
            r#"{ "format": "buf", "metadata": { "vertex_count": 3, "triangle_count": 1 },
                 "attributes": { "position": { "array": [0,0,0, 1,0,0, 0,1,0], "itemSize": 3 } },
                 "faces": [ { "type": "triangle", "vertices": [0, 1, 2] } ] }"#,
        )?;
        let mut pending = MeshLoader::spawn(&path)?;
        let mesh = poll_until_done(&mut pending).expect("loader finished")?;
        assert_eq!(mesh.polygons.faces.len(), 1);
        assert!(pending.is_finished());
        assert!(pending.poll().is_none());
        let _ = std::fs::remove_file(&path);
        Ok(())
    }
}
