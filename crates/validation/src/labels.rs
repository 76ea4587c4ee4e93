use anyhow::Context;
use std::fs;
use std::path::Path;

/// A labelled box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTruthBox {
    pub class_id: u32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl GroundTruthBox {
    pub fn corners(&self) -> (f32, f32, f32, f32) {
        (self.x1, self.y1, self.x2, self.y2)
    }
}

/// Load a YOLO label file for an image of `width`x`height` pixels.
///
/// A missing file means the image has no objects.
pub fn load_labels(path: &Path, width: u32, height: u32) -> anyhow::Result<Vec<GroundTruthBox>> {
    if !path.exists() {
        tracing::trace!(path = %path.display(), "No label file, treating as background");
        return Ok(Vec::new());
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read label file {}", path.display()))?;

    parse_labels(&text, width, height)
        .with_context(|| format!("Invalid label file {}", path.display()))
}

pub fn parse_labels(text: &str, width: u32, height: u32) -> anyhow::Result<Vec<GroundTruthBox>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            parse_label_line(line, width, height).with_context(|| format!("line {}", i + 1))
        })
        .collect()
}

/// `class cx cy w h` (normalized), or `class x1 y1 x2 y2 ...` for a polygon,
/// in which case the enclosing box is used.
fn parse_label_line(line: &str, width: u32, height: u32) -> anyhow::Result<GroundTruthBox> {
    let mut parts = line.split_whitespace();

    let class_id: u32 = parts
        .next()
        .context("empty label line")?
        .parse::<u32>()
        .context("class id is not a non-negative integer")?;

    let values = parts
        .map(|v| v.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .context("coordinate is not a number")?;

    let (w, h) = (width as f32, height as f32);

    let (x1, y1, x2, y2) = match values.len() {
        4 => {
            let (cx, cy, bw, bh) = (values[0], values[1], values[2], values[3]);
            (
                (cx - bw / 2.0) * w,
                (cy - bh / 2.0) * h,
                (cx + bw / 2.0) * w,
                (cy + bh / 2.0) * h,
            )
        }
        n if n >= 6 && n % 2 == 0 => {
            let xs = values.iter().step_by(2);
            let ys = values.iter().skip(1).step_by(2);
            let (min_x, max_x) = xs.fold((f32::MAX, f32::MIN), |(lo, hi), &x| (lo.min(x), hi.max(x)));
            let (min_y, max_y) = ys.fold((f32::MAX, f32::MIN), |(lo, hi), &y| (lo.min(y), hi.max(y)));
            (min_x * w, min_y * h, max_x * w, max_y * h)
        }
        n => anyhow::bail!("expected 4 box values or an even number of polygon values, got {}", n),
    };

    Ok(GroundTruthBox {
        class_id,
        x1: x1.clamp(0.0, w),
        y1: y1.clamp(0.0, h),
        x2: x2.clamp(0.0, w),
        y2: y2.clamp(0.0, h),
    })
}
