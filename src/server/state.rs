use std::path::PathBuf;

use crate::explain::Explainer;
use crate::reader::Reader;

#[derive(Clone)]
pub struct ServerState {
    pub reader: Reader,
    pub explainer: Explainer,
    /// Page served at `/`.
    pub index: PathBuf,
    /// Directory served under `/static/`.
    pub static_dir: PathBuf,
}
