#![cfg(unix)]

use overlay_core::{Action, ToolState};
use overlay_infra::{DiagnosticsProbe, ProbeEnv};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn action(id: &str, command: &str) -> Action {
    Action {
        id: id.to_string(),
        label: id.to_string(),
        command: command.to_string(),
        working_dir: None,
    }
}

fn env_with_path(dir: &Path) -> ProbeEnv {
    ProbeEnv::isolated().with_var("PATH", dir.to_string_lossy())
}

#[tokio::test]
async fn tool_on_path_reports_its_version_line() {
    let dir = tempfile::tempdir().unwrap();
    fake_tool(
        dir.path(),
        "magick",
        "echo 'Version: ImageMagick 7.1.1-21 Q16-HDRI'\necho 'Copyright: (C) 1999 ImageMagick Studio LLC'",
    );
    let probe = DiagnosticsProbe::new(env_with_path(dir.path()));

    let msgs = probe
        .preflight(&[
            action("shot", "magick import shot.png"),
            action("conv", "magick convert a.png b.jpg"),
        ])
        .await;
    assert_eq!(
        msgs,
        vec!["[OK] magick: Version: ImageMagick 7.1.1-21 Q16-HDRI".to_string()]
    );

    let snap = probe.probe_status().await;
    let magick = snap.get("magick").unwrap();
    assert_eq!(magick.state, ToolState::Ok);
    assert_eq!(magick.version, "Version: ImageMagick 7.1.1-21 Q16-HDRI");
}

#[tokio::test]
async fn nonzero_exit_is_a_warning_with_output() {
    let dir = tempfile::tempdir().unwrap();
    let tess = fake_tool(dir.path(), "tesseract-broken", "echo 'missing traineddata' >&2\nexit 1");

    let env = ProbeEnv::isolated().with_var("TESSERACT_PATH", tess.to_string_lossy());
    let snap = DiagnosticsProbe::new(env).probe_status().await;

    let status = snap.get("tesseract").unwrap();
    assert_eq!(status.state, ToolState::Warn);
    assert_eq!(status.version, "missing traineddata");
}

#[tokio::test]
async fn explicit_executable_path_is_checked_directly() {
    let dir = tempfile::tempdir().unwrap();
    let ffmpeg = fake_tool(dir.path(), "ffmpeg", "echo 'ffmpeg version 6.0'");

    // Not on PATH: only the explicit path can find it.
    let probe = DiagnosticsProbe::new(ProbeEnv::isolated());
    let command = format!("{} -i in.mov out.mp4", ffmpeg.display());
    let msgs = probe.preflight(&[action("enc", &command)]).await;

    assert_eq!(msgs, vec!["[OK] ffmpeg (explicit): ffmpeg version 6.0".to_string()]);
}

#[tokio::test]
async fn hanging_version_check_times_out_as_warning() {
    let dir = tempfile::tempdir().unwrap();
    fake_tool(dir.path(), "ffmpeg", "sleep 10");

    let probe =
        DiagnosticsProbe::new(env_with_path(dir.path())).with_timeout(Duration::from_millis(300));
    let msgs = probe.preflight(&[action("enc", "ffmpeg -version")]).await;

    assert_eq!(msgs.len(), 1);
    assert!(
        msgs[0].starts_with("[WARN] ffmpeg: ERR: timed out"),
        "{}",
        msgs[0]
    );
}
