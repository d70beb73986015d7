use crate::constants::*;
use crate::error::OptionsError;
use serde::Deserialize;
use std::env;
use std::path::{Component, Path, PathBuf};

/// Server settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub workers: usize,
    pub bind_address: String,
    pub prometheus_bind_address: Option<String>,
    pub timeout: u64,
    pub max_body_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: num_cpus::get() * 2,
            bind_address: DEFAULT_BIND.to_string(),
            prometheus_bind_address: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

fn normalize_bind_address(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.parse::<u16>().is_ok() {
        format!("0.0.0.0:{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let workers = env::var(ENV_WORKERS)
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .unwrap_or(0);
        let workers = if workers == 0 { num_cpus::get() * 2 } else { workers };

        let bind_address_raw = env::var(ENV_BIND).unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let bind_address = normalize_bind_address(&bind_address_raw);
        let prometheus_bind_address = env::var(ENV_PROMETHEUS_BIND)
            .ok()
            .map(|value| normalize_bind_address(&value));
        let timeout = env::var(ENV_TIMEOUT)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let max_body_size = match env::var(ENV_MAX_BODY_SIZE) {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("Invalid {}", ENV_MAX_BODY_SIZE))?,
            Err(_) => DEFAULT_MAX_BODY_SIZE,
        };

        Ok(Self {
            workers,
            bind_address,
            prometheus_bind_address,
            timeout,
            max_body_size,
        })
    }
}

/// One target size for a resized derivative. Output is stretched to exactly this size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeRatio {
    pub width: u32,
    pub height: u32,
}

impl ResizeRatio {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Upload options as supplied by the caller, before defaults and validation.
///
/// Field names follow the camelCase option names (`fileCompression`,
/// `fileResizeRatio`, ...) so a JSON options document deserializes directly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawUploadOptions {
    pub file_compression: bool,
    pub file_resize_ratio: Option<Vec<(u32, u32)>>,
    pub allow_extension: Option<Vec<String>>,
    pub image_quality: Option<i64>,
    pub base_path: Option<PathBuf>,
    pub local_path: Option<PathBuf>,
}

/// Validated upload options. Immutable once built, so one instance can be
/// shared across concurrent requests.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    file_compression: bool,
    file_resize_ratio: Vec<ResizeRatio>,
    allow_extension: Vec<String>,
    image_quality: u8,
    base_path: PathBuf,
    local_path: PathBuf,
    destination_dir: PathBuf,
}

impl UploadOptions {
    pub fn new(raw: RawUploadOptions) -> Result<Self, OptionsError> {
        let image_quality = match raw.image_quality {
            Some(q) if (1..=100).contains(&q) => q as u8,
            Some(q) => return Err(OptionsError::InvalidQuality(q)),
            None => DEFAULT_IMAGE_QUALITY,
        };

        let file_resize_ratio = raw
            .file_resize_ratio
            .unwrap_or_default()
            .into_iter()
            .map(|(width, height)| {
                if width == 0 || height == 0 {
                    Err(OptionsError::InvalidResizeRatio { width, height })
                } else {
                    Ok(ResizeRatio::new(width, height))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Empty entries would match every name, so they are dropped. An empty
        // list is treated as absent.
        let allow_extension: Vec<String> = raw
            .allow_extension
            .unwrap_or_default()
            .into_iter()
            .map(|ext| ext.trim().to_string())
            .filter(|ext| !ext.is_empty())
            .collect();
        let allow_extension = if allow_extension.is_empty() {
            DEFAULT_ALLOW_EXTENSION.iter().map(|ext| ext.to_string()).collect()
        } else {
            allow_extension
        };

        let working_dir = || env::current_dir().map_err(|e| OptionsError::BasePath(e.to_string()));
        let base_path = match raw.base_path {
            Some(path) if path.is_absolute() => path,
            Some(path) => working_dir()?.join(path),
            None => working_dir()?,
        };
        let local_path = raw.local_path.unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_PATH));
        let destination_dir = resolve_path(&base_path, &local_path);

        Ok(Self {
            file_compression: raw.file_compression,
            file_resize_ratio,
            allow_extension,
            image_quality,
            base_path,
            local_path,
            destination_dir,
        })
    }

    pub fn from_env() -> Result<Self, OptionsError> {
        let file_compression = env::var(ENV_FILE_COMPRESSION)
            .map(|v| parse_boolean(&v))
            .unwrap_or(false);

        let file_resize_ratio = match env::var(ENV_FILE_RESIZE_RATIO) {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_resize_ratios(&raw)?),
            _ => None,
        };

        let allow_extension = env::var(ENV_ALLOW_EXTENSION)
            .ok()
            .map(|s| s.split(',').map(|s| s.to_string()).collect());

        let image_quality = match env::var(ENV_IMAGE_QUALITY) {
            Ok(raw) => Some(raw.trim().parse::<i64>().map_err(|_| OptionsError::InvalidEnv {
                name: ENV_IMAGE_QUALITY,
                value: raw.clone(),
            })?),
            Err(_) => None,
        };

        Self::new(RawUploadOptions {
            file_compression,
            file_resize_ratio,
            allow_extension,
            image_quality,
            base_path: env::var(ENV_BASE_PATH).ok().map(PathBuf::from),
            local_path: env::var(ENV_LOCAL_PATH).ok().map(PathBuf::from),
        })
    }

    pub fn file_compression(&self) -> bool {
        self.file_compression
    }

    /// Empty when no resize ratios were configured.
    pub fn file_resize_ratio(&self) -> &[ResizeRatio] {
        &self.file_resize_ratio
    }

    pub fn allow_extension(&self) -> &[String] {
        &self.allow_extension
    }

    pub fn image_quality(&self) -> u8 {
        self.image_quality
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// `local_path` resolved against `base_path`, with `.` and `..` folded away.
    /// Always absolute.
    pub fn destination_dir(&self) -> &Path {
        &self.destination_dir
    }
}

fn parse_boolean(s: &str) -> bool {
    matches!(s.trim().to_lowercase().as_str(), "1" | "true")
}

/// Parses `100x100,200x200` into ordered `(width, height)` pairs.
fn parse_resize_ratios(raw: &str) -> Result<Vec<(u32, u32)>, OptionsError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || OptionsError::InvalidEnv {
                name: ENV_FILE_RESIZE_RATIO,
                value: entry.to_string(),
            };
            let (w, h) = entry.split_once(['x', 'X']).ok_or_else(|| invalid())?;
            let w = w.trim().parse::<u32>().map_err(|_| invalid())?;
            let h = h.trim().parse::<u32>().map_err(|_| invalid())?;
            Ok((w, h))
        })
        .collect()
}

/// Joins `relative` onto `base` and folds `.`/`..` lexically, without touching the filesystem.
/// An absolute `relative` replaces `base`. A `..` that climbs above a relative
/// base is kept; above the root it is dropped.
pub fn resolve_path(base: &Path, relative: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in base.join(relative).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match resolved.components().next_back() {
                Some(Component::Normal(_)) => {
                    resolved.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => resolved.push(".."),
            },
            other => resolved.push(other.as_os_str()),
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    lazy_static::lazy_static! {
        static ref ENV_LOCK: Mutex<()> = Mutex::new(());
    }

    fn restore_env_var(key: &str, original: Option<String>) {
        if let Some(value) = original {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }

    fn raw_with_base() -> RawUploadOptions {
        RawUploadOptions {
            base_path: Some(PathBuf::from("/srv/app/server")),
            ..RawUploadOptions::default()
        }
    }

    #[test]
    fn test_bind_numeric_port_maps_to_default_host() {
        let _guard = ENV_LOCK.lock().unwrap();
        let original_bind = env::var(ENV_BIND).ok();
        let original_prometheus = env::var(ENV_PROMETHEUS_BIND).ok();

        env::set_var(ENV_BIND, "3456");
        env::remove_var(ENV_PROMETHEUS_BIND);

        let config = Config::from_env().expect("config loads");

        assert_eq!(config.bind_address, "0.0.0.0:3456");
        assert_eq!(config.prometheus_bind_address, None);

        restore_env_var(ENV_BIND, original_bind);
        restore_env_var(ENV_PROMETHEUS_BIND, original_prometheus);
    }

    #[test]
    fn test_invalid_max_body_size_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        let original = env::var(ENV_MAX_BODY_SIZE).ok();

        env::set_var(ENV_MAX_BODY_SIZE, "lots");
        assert!(Config::from_env().is_err());

        env::set_var(ENV_MAX_BODY_SIZE, "1024");
        assert_eq!(Config::from_env().unwrap().max_body_size, 1024);

        restore_env_var(ENV_MAX_BODY_SIZE, original);
    }

    #[test]
    fn test_defaults_are_applied() {
        let options = UploadOptions::new(raw_with_base()).unwrap();

        assert!(!options.file_compression());
        assert!(options.file_resize_ratio().is_empty());
        assert_eq!(options.allow_extension(), ["jpeg", "jpg", "png"]);
        assert_eq!(options.image_quality(), 80);
        assert_eq!(options.local_path(), Path::new("../public"));
        assert_eq!(options.destination_dir(), Path::new("/srv/app/public"));
    }

    #[test]
    fn test_base_path_defaults_to_working_directory() {
        let options = UploadOptions::new(RawUploadOptions::default()).unwrap();
        assert_eq!(options.base_path(), env::current_dir().unwrap());
    }

    #[test]
    fn test_relative_base_path_resolves_against_working_directory() {
        let cwd = env::current_dir().unwrap();
        let options = UploadOptions::new(RawUploadOptions {
            base_path: Some(PathBuf::from(".")),
            ..RawUploadOptions::default()
        })
        .unwrap();

        assert!(options.base_path().is_absolute());
        assert!(options.destination_dir().is_absolute());
        assert_eq!(options.destination_dir(), resolve_path(&cwd, Path::new("../public")));
    }

    #[test]
    fn test_resolve_path_keeps_parent_of_relative_base() {
        assert_eq!(resolve_path(Path::new("."), Path::new("../public")), Path::new("../public"));
        assert_eq!(resolve_path(Path::new("app/server"), Path::new("../../..")), Path::new(".."));
        assert_eq!(resolve_path(Path::new("/"), Path::new("../public")), Path::new("/public"));
        assert_eq!(resolve_path(Path::new("/srv/app"), Path::new("../public")), Path::new("/srv/public"));
    }

    #[test]
    fn test_quality_bounds_are_accepted() {
        for quality in [1, 100] {
            let options = UploadOptions::new(RawUploadOptions {
                image_quality: Some(quality),
                ..raw_with_base()
            })
            .unwrap();
            assert_eq!(options.image_quality() as i64, quality);
        }
    }

    #[test]
    fn test_quality_out_of_range_is_rejected() {
        for quality in [0, 101, -5] {
            let err = UploadOptions::new(RawUploadOptions {
                image_quality: Some(quality),
                ..raw_with_base()
            })
            .unwrap_err();
            assert_eq!(err, OptionsError::InvalidQuality(quality));
        }
    }

    #[test]
    fn test_zero_resize_dimension_is_rejected() {
        let err = UploadOptions::new(RawUploadOptions {
            file_resize_ratio: Some(vec![(100, 100), (0, 50)]),
            ..raw_with_base()
        })
        .unwrap_err();
        assert_eq!(err, OptionsError::InvalidResizeRatio { width: 0, height: 50 });
    }

    #[test]
    fn test_resize_ratios_keep_declared_order() {
        let options = UploadOptions::new(RawUploadOptions {
            file_resize_ratio: Some(vec![(200, 200), (100, 50)]),
            ..raw_with_base()
        })
        .unwrap();
        assert_eq!(
            options.file_resize_ratio(),
            [ResizeRatio::new(200, 200), ResizeRatio::new(100, 50)]
        );
    }

    #[test]
    fn test_blank_allow_list_entries_are_dropped() {
        let options = UploadOptions::new(RawUploadOptions {
            allow_extension: Some(vec!["gif".to_string(), " ".to_string()]),
            ..raw_with_base()
        })
        .unwrap();
        assert_eq!(options.allow_extension(), ["gif"]);

        let options = UploadOptions::new(RawUploadOptions {
            allow_extension: Some(vec![]),
            ..raw_with_base()
        })
        .unwrap();
        assert_eq!(options.allow_extension(), ["jpeg", "jpg", "png"]);
    }

    #[test]
    fn test_absolute_local_path_replaces_base() {
        let options = UploadOptions::new(RawUploadOptions {
            local_path: Some(PathBuf::from("/var/uploads/./images")),
            ..raw_with_base()
        })
        .unwrap();
        assert_eq!(options.destination_dir(), Path::new("/var/uploads/images"));
    }

    #[test]
    fn test_raw_options_deserialize_from_camel_case() {
        let raw: RawUploadOptions = serde_json::from_str(
            r#"{
                "fileCompression": true,
                "fileResizeRatio": [[100, 100], [200, 150]],
                "imageQuality": 70,
                "allowExtension": ["jpeg", "jpg", "png"],
                "localPath": "uploads"
            }"#,
        )
        .unwrap();

        assert!(raw.file_compression);
        assert_eq!(raw.file_resize_ratio, Some(vec![(100, 100), (200, 150)]));
        assert_eq!(raw.image_quality, Some(70));
        assert_eq!(raw.local_path, Some(PathBuf::from("uploads")));
        assert_eq!(raw.base_path, None);
    }

    #[test]
    fn test_upload_options_from_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        let keys = [
            ENV_FILE_COMPRESSION,
            ENV_FILE_RESIZE_RATIO,
            ENV_ALLOW_EXTENSION,
            ENV_IMAGE_QUALITY,
            ENV_BASE_PATH,
            ENV_LOCAL_PATH,
        ];
        let originals: Vec<_> = keys.iter().map(|k| env::var(k).ok()).collect();

        env::set_var(ENV_FILE_COMPRESSION, "true");
        env::set_var(ENV_FILE_RESIZE_RATIO, "100x100, 320X240");
        env::set_var(ENV_ALLOW_EXTENSION, "png,webp");
        env::set_var(ENV_IMAGE_QUALITY, "65");
        env::set_var(ENV_BASE_PATH, "/data");
        env::set_var(ENV_LOCAL_PATH, "out");

        let options = UploadOptions::from_env().expect("options load");
        assert!(options.file_compression());
        assert_eq!(
            options.file_resize_ratio(),
            [ResizeRatio::new(100, 100), ResizeRatio::new(320, 240)]
        );
        assert_eq!(options.allow_extension(), ["png", "webp"]);
        assert_eq!(options.image_quality(), 65);
        assert_eq!(options.destination_dir(), Path::new("/data/out"));

        env::set_var(ENV_FILE_RESIZE_RATIO, "100by100");
        assert!(matches!(
            UploadOptions::from_env(),
            Err(OptionsError::InvalidEnv { name: ENV_FILE_RESIZE_RATIO, .. })
        ));

        for (key, original) in keys.iter().zip(originals) {
            restore_env_var(key, original);
        }
    }
}
