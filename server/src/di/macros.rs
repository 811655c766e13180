// ===== DELEGATION MACROS =====

macro_rules! delegate_to_node_client_variants {
    ($self:expr, $method:ident $(, $arg:expr)*) => {
        match $self {
            Self::LndGrpc(inner) => inner.$method($($arg),*),
        }
    };
}

// Export macros for use in parent module
pub(crate) use delegate_to_node_client_variants;
