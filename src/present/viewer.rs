use crate::detector::DetectionResult;
use crate::error::{Error, Result};
use crate::present::overlay::save_annotated;
use crate::present::Presenter;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Annotates the image and hands it to the platform image viewer.
pub struct ViewerPresenter {
    scratch_dir: PathBuf,
    save: Option<PathBuf>,
}

impl ViewerPresenter {
    pub fn new(scratch_dir: PathBuf, save: Option<PathBuf>) -> Self {
        Self { scratch_dir, save }
    }

    fn output_path(&self) -> PathBuf {
        self.save
            .clone()
            .unwrap_or_else(|| self.scratch_dir.join("last-detection.png"))
    }
}

impl Presenter for ViewerPresenter {
    fn present(&self, result: &DetectionResult) -> Result<()> {
        if !display_available(|key| std::env::var_os(key).is_some()) {
            return Err(Error::Display(
                "No display surface available; use --format annotate or --format json instead"
                    .to_string(),
            ));
        }

        let output = self.output_path();
        save_annotated(result, &output)?;

        tracing::info!("Opening {:?} in the image viewer", output);
        open_viewer(&output)
    }
}

/// On Linux and the BSDs a viewer needs an X11 or Wayland session.
pub fn display_available<F>(has_var: F) -> bool
where
    F: Fn(&str) -> bool,
{
    if cfg!(any(target_os = "macos", target_os = "windows")) {
        return true;
    }
    has_var("DISPLAY") || has_var("WAYLAND_DISPLAY")
}

fn viewer_command(path: &Path) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(path);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
}

fn open_viewer(path: &Path) -> Result<()> {
    let mut cmd = viewer_command(path);
    let status = cmd.status().map_err(|e| {
        Error::Display(format!(
            "Failed to launch {:?}: {}",
            cmd.get_program(),
            e
        ))
    })?;

    if !status.success() {
        return Err(Error::Display(format!(
            "{:?} exited with {}",
            cmd.get_program(),
            status
        )));
    }
    Ok(())
}
