// Adapters layer: concrete record stores behind the domain ports.

pub mod dataverse;
pub mod memory;
pub mod provisioning;
