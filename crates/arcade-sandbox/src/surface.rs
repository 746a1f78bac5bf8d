//! Headless drawing surface
//!
//! The only drawing capability handed to scripts. Calls are checked for
//! argument shape and counted; pixels are never produced or read back.

use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, INT};

/// Drawing surface handle exposed to scripts as `surface`
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: f64,
    height: f64,
    draw_calls: u64,
    fill: String,
    stroke: String,
}

impl Surface {
    /// Create a blank surface
    #[inline]
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            draw_calls: 0,
            fill: "#000000".to_string(),
            stroke: "#000000".to_string(),
        }
    }

    /// Surface width
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Surface height
    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Number of drawing calls recorded so far
    #[inline]
    #[must_use]
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    /// Current fill colour
    #[inline]
    #[must_use]
    pub fn fill(&self) -> &str {
        &self.fill
    }

    /// Current stroke colour
    #[inline]
    #[must_use]
    pub fn stroke(&self) -> &str {
        &self.stroke
    }

    fn draw(&mut self, op: &str, args: &[&Dynamic]) -> Result<(), Box<EvalAltResult>> {
        for (position, arg) in args.iter().enumerate() {
            if number(arg).is_none() {
                return Err(format!(
                    "{op}: argument {} must be a number, got {}",
                    position + 1,
                    arg.type_name()
                )
                .into());
            }
        }
        self.draw_calls += 1;
        Ok(())
    }
}

fn number(value: &Dynamic) -> Option<f64> {
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|i| i as f64))
}

/// Register the surface type and its methods on an engine
pub(crate) fn register(engine: &mut Engine) {
    engine
        .register_type_with_name::<Surface>("Surface")
        .register_get("width", |s: &mut Surface| s.width)
        .register_get("height", |s: &mut Surface| s.height)
        .register_get("draw_calls", |s: &mut Surface| {
            INT::try_from(s.draw_calls).unwrap_or(INT::MAX)
        })
        .register_fn("clear", |s: &mut Surface| s.draw("clear", &[]))
        .register_fn(
            "clear_rect",
            |s: &mut Surface, x: Dynamic, y: Dynamic, w: Dynamic, h: Dynamic| {
                s.draw("clear_rect", &[&x, &y, &w, &h])
            },
        )
        .register_fn(
            "fill_rect",
            |s: &mut Surface, x: Dynamic, y: Dynamic, w: Dynamic, h: Dynamic| {
                s.draw("fill_rect", &[&x, &y, &w, &h])
            },
        )
        .register_fn(
            "stroke_rect",
            |s: &mut Surface, x: Dynamic, y: Dynamic, w: Dynamic, h: Dynamic| {
                s.draw("stroke_rect", &[&x, &y, &w, &h])
            },
        )
        .register_fn(
            "fill_circle",
            |s: &mut Surface, x: Dynamic, y: Dynamic, r: Dynamic| {
                s.draw("fill_circle", &[&x, &y, &r])
            },
        )
        .register_fn(
            "line",
            |s: &mut Surface, x1: Dynamic, y1: Dynamic, x2: Dynamic, y2: Dynamic| {
                s.draw("line", &[&x1, &y1, &x2, &y2])
            },
        )
        .register_fn(
            "fill_text",
            |s: &mut Surface, _text: Dynamic, x: Dynamic, y: Dynamic| {
                s.draw("fill_text", &[&x, &y])
            },
        )
        .register_fn("set_fill", |s: &mut Surface, color: ImmutableString| {
            s.fill = color.to_string();
        })
        .register_fn("set_stroke", |s: &mut Surface, color: ImmutableString| {
            s.stroke = color.to_string();
        });
}
