use std::io;

/// Problems with the startup configuration. All of these are found before a
/// single core is launched.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one core is required")]
    NoCores,

    #[error("memory of {len} bytes can't be split into {cores} regions of whole 4-byte cells")]
    MisalignedMemory { len: usize, cores: usize },

    #[error("display has {pixels} pixels but {cores} cores need one each")]
    DisplayTooSmall { pixels: usize, cores: usize },

    #[error("only one memory pattern may be chosen")]
    ConflictingPatterns,

    #[error("{0} is too large")]
    TooLarge(&'static str),
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("display driver error: {0}")]
    Display(#[source] io::Error),

    #[error("failed to start core {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to load memory image: {0}")]
    Image(#[source] io::Error),
}
