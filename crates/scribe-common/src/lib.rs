pub mod config;
pub mod error;
pub mod protocol;

pub mod intent {
    pub mod definition;
}
