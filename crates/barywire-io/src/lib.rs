pub mod buf;
pub mod loader;

pub use buf::{
    BUF_FORMAT, BufAttribute, BufDocument, BufFace, BufMesh, BufMetadata, FaceKind, load_buf,
    parse_buf, save_buf, write_buf,
};
pub use loader::{MeshLoader, PendingMesh};
