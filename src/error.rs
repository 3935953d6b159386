use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },

    #[error("failed to decode image {path}: {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid glTF {path}: {source}")]
    Gltf {
        path: String,
        #[source]
        source: gltf::Error,
    },

    #[error("unsupported uri in {path}: {uri}")]
    UnsupportedUri { path: String, uri: String },

    #[error("glTF {path} references missing buffer {index}")]
    MissingBuffer { path: String, index: usize },

    #[error("invalid typeface {path}: {source}")]
    Font {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("typeface {path}: glyph {glyph:?}: {reason}")]
    Glyph { path: String, glyph: char, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    /// The walk clip was requested before the character model finished loading.
    #[error("character animation mixer is not loaded yet")]
    CharacterNotLoaded,

    #[error("character model has no animation clip {0}")]
    ClipMissing(usize),
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output: {0}")]
    Output(#[from] rodio::StreamError),

    #[error("cannot create sink: {0}")]
    Sink(#[from] rodio::PlayError),

    #[error("cannot decode clip: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),

    #[error(transparent)]
    Asset(#[from] AssetError),
}
