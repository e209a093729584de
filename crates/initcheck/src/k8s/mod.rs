/// Kubernetes API interaction module for the initcheck binary.
pub mod api;
