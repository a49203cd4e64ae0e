use super::ProbeEnv;
use overlay_config::{FFMPEG_PATH_ENV, TESSERACT_PATH_ENV};
use overlay_core::Tool;
use std::path::PathBuf;

/// An executable dependency and how to find and interrogate it.
#[derive(Debug)]
pub(crate) struct ToolSpec {
    pub tool: Tool,
    pub binary: &'static str,
    pub version_flag: &'static str,
    pub env_override: Option<&'static str>,
}

pub(crate) const EXECUTABLE_TOOLS: [ToolSpec; 3] = [
    ToolSpec {
        tool: Tool::Magick,
        binary: "magick",
        version_flag: "-version",
        env_override: None,
    },
    ToolSpec {
        tool: Tool::Tesseract,
        binary: "tesseract",
        version_flag: "--version",
        env_override: Some(TESSERACT_PATH_ENV),
    },
    ToolSpec {
        tool: Tool::Ffmpeg,
        binary: "ffmpeg",
        version_flag: "-version",
        env_override: Some(FFMPEG_PATH_ENV),
    },
];

/// Matches a command's first word against the known tools by file name,
/// ignoring case, directories and a trailing `.exe`.
pub(crate) fn spec_for_token(token: &str) -> Option<&'static ToolSpec> {
    let file_name = token.rsplit(['/', '\\']).next().unwrap_or(token);
    let lower = file_name.to_ascii_lowercase();
    let name = lower.strip_suffix(".exe").unwrap_or(&lower);
    EXECUTABLE_TOOLS.iter().find(|spec| spec.binary == name)
}

pub(crate) fn is_explicit_path(token: &str) -> bool {
    token.contains('/') || token.contains('\\')
}

/// PATH, then the tool's environment override, then well-known install locations.
pub(crate) fn resolve(spec: &ToolSpec, env: &ProbeEnv) -> Option<PathBuf> {
    if let Some(path) = env.which(spec.binary) {
        return Some(path);
    }

    if let Some(path) = spec.env_override.and_then(|key| env.var(key)) {
        return Some(PathBuf::from(path));
    }

    if !env.install_dirs_enabled() {
        return None;
    }
    install_candidates(spec)
        .into_iter()
        .find(|candidate| candidate.is_file())
}

#[cfg(target_os = "windows")]
fn install_candidates(spec: &ToolSpec) -> Vec<PathBuf> {
    const PROGRAM_FILES: &str = "C:/Program Files";

    match spec.tool {
        Tool::Magick => {
            // Versioned install dirs, e.g. `ImageMagick-7.1.1-Q16-HDRI`.
            let mut dirs: Vec<PathBuf> = std::fs::read_dir(PROGRAM_FILES)
                .into_iter()
                .flatten()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_name().to_string_lossy().starts_with("ImageMagick"))
                .map(|entry| entry.path().join("magick.exe"))
                .collect();
            dirs.sort();
            dirs
        }
        Tool::Tesseract => vec![
            PathBuf::from("C:/Progra~1/Tesseract-OCR/tesseract.exe"),
            PathBuf::from("C:/Program Files/Tesseract-OCR/tesseract.exe"),
        ],
        Tool::Ffmpeg => vec![
            PathBuf::from("C:/ffmpeg/bin/ffmpeg.exe"),
            PathBuf::from("C:/Program Files/ffmpeg/bin/ffmpeg.exe"),
        ],
        Tool::N8n => Vec::new(),
    }
}

#[cfg(not(target_os = "windows"))]
fn install_candidates(spec: &ToolSpec) -> Vec<PathBuf> {
    ["/opt/homebrew/bin", "/usr/local/bin", "/snap/bin"]
        .iter()
        .map(|dir| PathBuf::from(dir).join(spec.binary))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_match_by_file_name() {
        assert_eq!(spec_for_token("magick").map(|s| s.tool), Some(Tool::Magick));
        assert_eq!(spec_for_token("MAGICK.EXE").map(|s| s.tool), Some(Tool::Magick));
        assert_eq!(
            spec_for_token(r"C:\Program Files\Tesseract-OCR\tesseract.exe").map(|s| s.tool),
            Some(Tool::Tesseract)
        );
        assert_eq!(
            spec_for_token("/usr/bin/ffmpeg").map(|s| s.tool),
            Some(Tool::Ffmpeg)
        );
        assert!(spec_for_token("python").is_none());
        assert!(spec_for_token("magick-helper").is_none());
    }

    #[test]
    fn explicit_paths_contain_a_separator() {
        assert!(is_explicit_path("./magick"));
        assert!(is_explicit_path(r"C:\tools\tesseract.exe"));
        assert!(!is_explicit_path("tesseract.exe"));
    }

    #[test]
    fn isolated_env_resolves_nothing() {
        let env = ProbeEnv::isolated();
        for spec in &EXECUTABLE_TOOLS {
            assert!(resolve(spec, &env).is_none(), "{}", spec.binary);
        }
    }

    #[test]
    fn env_override_is_used_when_path_lookup_fails() {
        let env = ProbeEnv::isolated().with_var(TESSERACT_PATH_ENV, "/opt/ocr/tesseract");
        let spec = spec_for_token("tesseract").unwrap();
        assert_eq!(
            resolve(spec, &env),
            Some(PathBuf::from("/opt/ocr/tesseract"))
        );

        // magick has no override variable
        let magick = spec_for_token("magick").unwrap();
        assert!(resolve(magick, &env).is_none());
    }
}
