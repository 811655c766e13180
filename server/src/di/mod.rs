use crate::di::delegates::NodeClientDelegate;

pub mod delegates;
pub mod inject;
pub mod macros;

// ===== TYPE ALIASES =====

type Node = NodeClientDelegate;
