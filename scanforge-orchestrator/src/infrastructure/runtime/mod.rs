pub mod docker;
pub mod traits;

pub use docker::DockerCliRuntime;
pub use traits::{ContainerRuntime, RuntimeError};
