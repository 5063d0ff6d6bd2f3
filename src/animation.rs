//! # Animation Module
//!
//! Assembles rendered frames into a looping GIF. Frames are encoded in memory and the
//! result is written through a temporary file in the destination directory, so a
//! failed run never leaves a truncated animation behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageFormat, RgbaImage};
use log::{debug, info};

use crate::error::{Nc2GifError, Result};
use crate::input::AnimationConfig;

/// Encodes `frames` as an animated GIF held in memory.
///
/// Every frame gets the same display duration. Frames must all share one size.
pub fn encode_gif(frames: &[RgbaImage], config: &AnimationConfig) -> Result<Vec<u8>> {
    let Some(first) = frames.first() else {
        return Err(Nc2GifError::Render("cannot encode an animation without frames".to_string()));
    };
    let size = first.dimensions();
    if let Some((i, frame)) = frames.iter().enumerate().find(|(_, f)| f.dimensions() != size) {
        return Err(Nc2GifError::ShapeMismatch(format!(
            "frame {} is {}x{} but frame 0 is {}x{}",
            i,
            frame.width(),
            frame.height(),
            size.0,
            size.1
        )));
    }

    let repeat = match config.repeat {
        Some(count) => Repeat::Finite(count),
        None => Repeat::Infinite,
    };
    let delay = Delay::from_numer_denom_ms(config.frame_delay_ms(), 1);

    let mut buffer = Vec::new();
    {
        let mut encoder = GifEncoder::new_with_speed(&mut buffer, config.speed);
        encoder.set_repeat(repeat)?;
        encoder.encode_frames(
            frames
                .iter()
                .map(|img| Frame::from_parts(img.clone(), 0, 0, delay)),
        )?;
    }
    debug!(
        "Encoded {} frames ({}x{}) into {} bytes",
        frames.len(),
        size.0,
        size.1,
        buffer.len()
    );
    Ok(buffer)
}

/// Encodes `frames` and writes the animation to `output_path`.
///
/// # Errors
///
/// Returns [`Nc2GifError::OutputExists`] when the file exists and `force` is not set,
/// and propagates encoding and I/O failures. On failure the destination is untouched.
pub fn write_animation(frames: &[RgbaImage], config: &AnimationConfig, output_path: &Path, force: bool) -> Result<u64> {
    if output_path.exists() && !force {
        return Err(Nc2GifError::OutputExists(output_path.display().to_string()));
    }
    let bytes = encode_gif(frames, config)?;
    write_atomically(output_path, &bytes)?;
    info!(
        "Wrote {} frame animation to {} ({} bytes)",
        frames.len(),
        output_path.display(),
        bytes.len()
    );
    Ok(bytes.len() as u64)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Nc2GifError::Io(e.error))?;
    Ok(())
}

/// File name of the `index`-th frame image.
pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:03}.png", index)
}

/// Writes every frame as a PNG into `dir`, creating it when needed.
pub fn write_frame_images(frames: &[RgbaImage], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(frames.len());
    for (i, frame) in frames.iter().enumerate() {
        let path = dir.join(frame_file_name(i));
        frame.save_with_format(&path, ImageFormat::Png)?;
        written.push(path);
    }
    debug!("Wrote {} frame images to {}", written.len(), dir.display());
    Ok(written)
}
