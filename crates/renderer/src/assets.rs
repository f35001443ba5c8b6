//! Resource loading for the planet renderer.
//!
//! Assets are opaque byte blobs addressed by a logical name relative to an
//! [`AssetSource`], either a directory on disk or a base URL. The two surface
//! images are fetched and decoded on worker threads and joined as a pair; if
//! either fails the whole step fails and the other result is dropped.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::thread;

use futures::channel::oneshot;
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};

const BUNDLED_VERTEX_SHADER: &str = include_str!("../../../assets/shaders/quad.vert.wgsl");
const BUNDLED_FRAGMENT_SHADER: &str = include_str!("../../../assets/shaders/scattering.frag.wgsl");

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read asset '{name}' at {path}")]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch asset '{name}'")]
    Http {
        name: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("fetching asset '{name}' returned HTTP {status}")]
    HttpStatus { name: String, status: StatusCode },
    #[error("failed to decode image '{name}'")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("asset '{name}' is not valid UTF-8")]
    Utf8 {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("invalid asset source '{location}': {reason}")]
    InvalidSource { location: String, reason: String },
    #[error("loader for asset '{name}' exited without a result")]
    Worker { name: String },
}

/// Logical names of the four assets the renderer consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    pub day_texture: String,
    pub night_texture: String,
    pub vertex_shader: String,
    pub fragment_shader: String,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            day_texture: "textures/earth-day.png".into(),
            night_texture: "textures/earth-night.png".into(),
            vertex_shader: "shaders/quad.vert.wgsl".into(),
            fragment_shader: "shaders/scattering.frag.wgsl".into(),
        }
    }
}

/// Where asset bytes are fetched from.
#[derive(Debug, Clone)]
pub enum AssetSource {
    Directory(PathBuf),
    Remote { base: Url, client: Client },
}

/// True for `http://` and `https://` locations.
pub fn is_remote_location(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

impl AssetSource {
    /// Interprets remote locations (see [`is_remote_location`]) as a base URL,
    /// anything else as a directory.
    pub fn parse(location: &str) -> Result<Self, AssetError> {
        if is_remote_location(location) {
            Self::remote(location)
        } else {
            Ok(Self::Directory(PathBuf::from(location)))
        }
    }

    pub fn directory(root: impl Into<PathBuf>) -> Self {
        Self::Directory(root.into())
    }

    pub fn remote(location: &str) -> Result<Self, AssetError> {
        let invalid = |reason: String| AssetError::InvalidSource {
            location: location.to_string(),
            reason,
        };
        let mut base = Url::parse(location).map_err(|err| invalid(err.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .build()
            .map_err(|err| invalid(err.to_string()))?;
        Ok(Self::Remote { base, client })
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Directory(root) => root.display().to_string(),
            Self::Remote { base, .. } => base.to_string(),
        }
    }

    /// Fetches one asset as raw bytes.
    pub async fn fetch(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        match self {
            Self::Directory(root) => read_file(root, name),
            Self::Remote { base, client } => fetch_remote(client, base, name),
        }
    }

    pub async fn fetch_text(&self, name: &str) -> Result<String, AssetError> {
        let bytes = self.fetch(name).await?;
        String::from_utf8(bytes).map_err(|source| AssetError::Utf8 {
            name: name.to_string(),
            source,
        })
    }
}

fn read_file(root: &Path, name: &str) -> Result<Vec<u8>, AssetError> {
    let path = root.join(name);
    tracing::debug!(asset = name, path = %path.display(), "reading asset");
    std::fs::read(&path).map_err(|source| AssetError::Io {
        name: name.to_string(),
        path,
        source,
    })
}

fn fetch_remote(client: &Client, base: &Url, name: &str) -> Result<Vec<u8>, AssetError> {
    let url = base.join(name).map_err(|err| AssetError::InvalidSource {
        location: format!("{base}{name}"),
        reason: err.to_string(),
    })?;
    tracing::debug!(asset = name, %url, "fetching asset");
    let http_error = |source| AssetError::Http {
        name: name.to_string(),
        source,
    };
    let response = client.get(url).send().map_err(http_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(AssetError::HttpStatus {
            name: name.to_string(),
            status,
        });
    }
    let bytes = response.bytes().map_err(http_error)?;
    Ok(bytes.to_vec())
}

/// CPU-side RGBA8 pixels ready for upload.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub fn decode_image(name: &str, bytes: &[u8]) -> Result<DecodedImage, AssetError> {
    let image = image::load_from_memory(bytes).map_err(|source| AssetError::Decode {
        name: name.to_string(),
        source,
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        name: name.to_string(),
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

pub async fn load_image(source: &AssetSource, name: &str) -> Result<DecodedImage, AssetError> {
    let bytes = source.fetch(name).await?;
    decode_image(name, &bytes)
}

/// Runs [`load_image`] on its own thread and resolves when it finishes.
fn spawn_image_load(
    source: AssetSource,
    name: String,
) -> impl Future<Output = Result<DecodedImage, AssetError>> {
    let (sender, receiver) = oneshot::channel();
    let worker_name = name.clone();
    let spawned = thread::Builder::new()
        .name(format!("asset-{name}"))
        .spawn(move || {
            let result = pollster::block_on(load_image(&source, &worker_name));
            let _ = sender.send(result);
        });
    if let Err(err) = spawned {
        tracing::error!(asset = %name, error = %err, "failed to spawn asset loader thread");
    }

    async move {
        receiver
            .await
            .map_err(|_| AssetError::Worker { name: name.clone() })?
    }
}

/// Decoded day and night surface images.
#[derive(Debug, Clone)]
pub struct SurfaceImages {
    pub day: DecodedImage,
    pub night: DecodedImage,
}

pub async fn load_surface_images(
    source: &AssetSource,
    manifest: &AssetManifest,
) -> Result<SurfaceImages, AssetError> {
    let day = spawn_image_load(source.clone(), manifest.day_texture.clone());
    let night = spawn_image_load(source.clone(), manifest.night_texture.clone());
    let (day, night) = futures::try_join!(day, night)?;
    tracing::info!(
        day = %format!("{}x{}", day.width, day.height),
        night = %format!("{}x{}", night.width, night.height),
        "loaded surface textures"
    );
    Ok(SurfaceImages { day, night })
}

/// WGSL source text for the two shader stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    /// Programs shipped with the crate.
    pub fn bundled() -> Self {
        Self {
            vertex: BUNDLED_VERTEX_SHADER.to_string(),
            fragment: BUNDLED_FRAGMENT_SHADER.to_string(),
        }
    }

    pub async fn load(source: &AssetSource, manifest: &AssetManifest) -> Result<Self, AssetError> {
        let vertex = source.fetch_text(&manifest.vertex_shader).await?;
        let fragment = source.fetch_text(&manifest.fragment_shader).await?;
        Ok(Self { vertex, fragment })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(root: &Path, name: &str, width: u32, height: u32) {
        let path = root.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
    }

    #[test]
    fn parse_distinguishes_remote_from_directory() {
        assert!(matches!(
            AssetSource::parse("assets").unwrap(),
            AssetSource::Directory(_)
        ));
        match AssetSource::parse("https://example.com/static").unwrap() {
            AssetSource::Remote { base, .. } => {
                assert_eq!(base.as_str(), "https://example.com/static/");
                assert_eq!(
                    base.join("textures/earth-day.png").unwrap().as_str(),
                    "https://example.com/static/textures/earth-day.png"
                );
            }
            other => panic!("expected remote source, got {other:?}"),
        }
    }

    #[test]
    fn remote_locations_need_an_http_scheme() {
        assert!(is_remote_location("http://localhost:8080/planet"));
        assert!(is_remote_location("https://example.com"));
        assert!(!is_remote_location("assets"));
        assert!(!is_remote_location("/srv/http/planet"));
        assert!(!is_remote_location("ftp://example.com/planet"));
    }

    #[test]
    fn decodes_images_to_rgba() {
        let root = TempDir::new().unwrap();
        write_png(root.path(), "day.png", 4, 2);
        let bytes = std::fs::read(root.path().join("day.png")).unwrap();
        let image = decode_image("day.png", &bytes).unwrap();
        assert_eq!((image.width, image.height), (4, 2));
        assert_eq!(image.pixels.len(), 4 * 2 * 4);
        assert_eq!(&image.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_image("night.png", b"definitely not an image").unwrap_err();
        assert!(matches!(err, AssetError::Decode { ref name, .. } if name == "night.png"));
    }

    #[test]
    fn loads_both_surface_images() {
        let root = TempDir::new().unwrap();
        let manifest = AssetManifest::default();
        write_png(root.path(), &manifest.day_texture, 8, 4);
        write_png(root.path(), &manifest.night_texture, 16, 8);

        let source = AssetSource::directory(root.path());
        let images = pollster::block_on(load_surface_images(&source, &manifest)).unwrap();
        assert_eq!((images.day.width, images.day.height), (8, 4));
        assert_eq!((images.night.width, images.night.height), (16, 8));
    }

    #[test]
    fn missing_night_image_fails_the_pair() {
        let root = TempDir::new().unwrap();
        let manifest = AssetManifest::default();
        write_png(root.path(), &manifest.day_texture, 8, 4);

        let source = AssetSource::directory(root.path());
        let err = pollster::block_on(load_surface_images(&source, &manifest)).unwrap_err();
        match err {
            AssetError::Io { name, .. } => assert_eq!(name, manifest.night_texture),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Serves `files` over HTTP on a loopback port and returns the base URL.
    /// Any other path answers 404.
    fn serve(files: Vec<(&'static str, Vec<u8>)>) -> String {
        use std::io::{BufRead, BufReader, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/planet", listener.local_addr().unwrap());
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                        break;
                    }
                }
                let path = request_line.split_whitespace().nth(1).unwrap_or("");
                let body = files
                    .iter()
                    .find(|(name, _)| path == format!("/planet/{name}"))
                    .map(|(_, body)| body.as_slice());
                let (status, body) = match body {
                    Some(body) => ("200 OK", body),
                    None => ("404 Not Found", &b"not found"[..]),
                };
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(body);
            }
        });
        base
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]))
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn remote_images_load_over_http() {
        let base = serve(vec![
            ("textures/earth-day.png", png_bytes(8, 4)),
            ("textures/earth-night.png", png_bytes(2, 2)),
        ]);
        let source = AssetSource::parse(&base).unwrap();
        let images =
            pollster::block_on(load_surface_images(&source, &AssetManifest::default())).unwrap();
        assert_eq!((images.day.width, images.day.height), (8, 4));
        assert_eq!((images.night.width, images.night.height), (2, 2));
    }

    #[test]
    fn remote_404_fails_the_pair() {
        let base = serve(vec![("textures/earth-day.png", png_bytes(8, 4))]);
        let source = AssetSource::parse(&base).unwrap();
        let manifest = AssetManifest::default();

        let err = pollster::block_on(load_surface_images(&source, &manifest)).unwrap_err();
        match err {
            AssetError::HttpStatus { name, status } => {
                assert_eq!(name, manifest.night_texture);
                assert_eq!(status, StatusCode::NOT_FOUND);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn shader_sources_load_from_directory() {
        let root = TempDir::new().unwrap();
        let manifest = AssetManifest::default();
        let shaders = root.path().join("shaders");
        std::fs::create_dir_all(&shaders).unwrap();
        std::fs::write(shaders.join("quad.vert.wgsl"), "// vertex").unwrap();
        std::fs::write(shaders.join("scattering.frag.wgsl"), "// fragment").unwrap();

        let source = AssetSource::directory(root.path());
        let loaded = pollster::block_on(ShaderSources::load(&source, &manifest)).unwrap();
        assert_eq!(loaded.vertex, "// vertex");
        assert_eq!(loaded.fragment, "// fragment");
    }

    #[test]
    fn bundled_shaders_declare_main_entry_points() {
        let sources = ShaderSources::bundled();
        assert!(sources.vertex.contains("fn main"));
        assert!(sources.fragment.contains("fn main"));
    }
}
