//! Viewport transform, auto-fit and the move-to-node animation.

pub const MIN_ZOOM: f64 = 0.02;
pub const MAX_ZOOM: f64 = 20.0;
pub const ZOOM_STEP: f64 = 1.5;
const FIT_PADDING: f64 = 40.0;
const MOVE_DURATION: f64 = 0.6;

pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Axis-aligned bounds in graph space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
	pub min_x: f64,
	pub min_y: f64,
	pub max_x: f64,
	pub max_y: f64,
}

impl BBox {
	/// Smallest box holding every point, or `None` for no points.
	pub fn around(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
		points.into_iter().fold(None, |acc, (x, y)| {
			Some(match acc {
				None => Self {
					min_x: x,
					min_y: y,
					max_x: x,
					max_y: y,
				},
				Some(b) => Self {
					min_x: b.min_x.min(x),
					min_y: b.min_y.min(y),
					max_x: b.max_x.max(x),
					max_y: b.max_y.max(y),
				},
			})
		})
	}

	pub fn center(&self) -> (f64, f64) {
		((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
	}
}

/// `screen = graph * k + (x, y)`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

#[derive(Clone, Debug)]
struct CameraAnimation {
	from: ViewTransform,
	to: ViewTransform,
	elapsed: f64,
}

#[derive(Clone, Debug, Default)]
pub struct Camera {
	pub transform: ViewTransform,
	/// Set once the user takes over the camera; while set, the view no
	/// longer rescales itself to fit the graph.
	custom_bbox: Option<BBox>,
	animation: Option<CameraAnimation>,
	pub fullscreen: bool,
}

impl Camera {
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn graph_to_screen(&self, gx: f64, gy: f64) -> (f64, f64) {
		(
			gx * self.transform.k + self.transform.x,
			gy * self.transform.k + self.transform.y,
		)
	}

	pub fn custom_bbox(&self) -> Option<BBox> {
		self.custom_bbox
	}

	/// Pin the camera to `bbox`, stopping auto-fit. No-op if already pinned.
	pub fn fix_bbox(&mut self, bbox: Option<BBox>) {
		if self.custom_bbox.is_none() {
			self.custom_bbox = Some(bbox.unwrap_or(BBox {
				min_x: 0.0,
				min_y: 0.0,
				max_x: 0.0,
				max_y: 0.0,
			}));
		}
	}

	/// Transform that fits `bbox` inside a `width` x `height` viewport.
	pub fn fit_transform(bbox: &BBox, width: f64, height: f64) -> ViewTransform {
		let (bw, bh) = (bbox.max_x - bbox.min_x, bbox.max_y - bbox.min_y);
		let (aw, ah) = (
			(width - 2.0 * FIT_PADDING).max(1.0),
			(height - 2.0 * FIT_PADDING).max(1.0),
		);
		let k = if bw <= f64::EPSILON && bh <= f64::EPSILON {
			1.0
		} else {
			(aw / bw.max(f64::EPSILON))
				.min(ah / bh.max(f64::EPSILON))
				.clamp(MIN_ZOOM, MAX_ZOOM)
		};
		let (cx, cy) = bbox.center();
		ViewTransform {
			x: width / 2.0 - cx * k,
			y: height / 2.0 - cy * k,
			k,
		}
	}

	/// Follow the graph bounds unless the user has pinned the camera.
	pub fn auto_fit(&mut self, bbox: Option<BBox>, width: f64, height: f64) -> bool {
		if self.custom_bbox.is_some() || self.animation.is_some() {
			return false;
		}
		let Some(bbox) = bbox else {
			return false;
		};
		let fitted = Self::fit_transform(&bbox, width, height);
		let changed = fitted != self.transform;
		self.transform = fitted;
		changed
	}

	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		self.animation = None;
		self.transform.x += dx;
		self.transform.y += dy;
	}

	/// Zoom by `factor` keeping the screen point `(sx, sy)` fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		self.animation = None;
		let new_k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	/// Drop the pinned bounds so the next tick fits the whole graph again.
	pub fn reset(&mut self) {
		self.custom_bbox = None;
		self.animation = None;
	}

	/// Start an animation that centers graph point `(gx, gy)` in the viewport.
	/// Restarts from the current transform if one is already running.
	pub fn animate_to(&mut self, gx: f64, gy: f64, width: f64, height: f64) {
		let k = self.transform.k;
		self.animation = Some(CameraAnimation {
			from: self.transform,
			to: ViewTransform {
				x: width / 2.0 - gx * k,
				y: height / 2.0 - gy * k,
				k,
			},
			elapsed: 0.0,
		});
	}

	pub fn is_animating(&self) -> bool {
		self.animation.is_some()
	}

	/// Advance the running animation; returns whether the transform moved.
	pub fn advance(&mut self, dt: f64) -> bool {
		let Some(anim) = self.animation.as_mut() else {
			return false;
		};
		anim.elapsed += dt;
		let t = ease_out_cubic((anim.elapsed / MOVE_DURATION).min(1.0));
		let lerp = |a: f64, b: f64| a + (b - a) * t;
		self.transform = ViewTransform {
			x: lerp(anim.from.x, anim.to.x),
			y: lerp(anim.from.y, anim.to.y),
			k: lerp(anim.from.k, anim.to.k),
		};
		if anim.elapsed >= MOVE_DURATION {
			self.animation = None;
		}
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn screen_graph_round_trip() {
		let camera = Camera {
			transform: ViewTransform {
				x: 10.0,
				y: -5.0,
				k: 2.0,
			},
			..Camera::default()
		};
		let (gx, gy) = camera.screen_to_graph(30.0, 15.0);
		assert_eq!((gx, gy), (10.0, 10.0));
		assert_eq!(camera.graph_to_screen(gx, gy), (30.0, 15.0));
	}

	#[test]
	fn fixed_bbox_stops_auto_fit() {
		let bbox = BBox::around([(0.0, 0.0), (100.0, 50.0)]);
		let mut camera = Camera::default();
		assert!(camera.auto_fit(bbox, 800.0, 600.0));
		let fitted = camera.transform;

		camera.fix_bbox(bbox);
		camera.pan_by(5.0, 0.0);
		assert!(!camera.auto_fit(BBox::around([(0.0, 0.0), (1.0, 1.0)]), 800.0, 600.0));
		assert_eq!(camera.transform.x, fitted.x + 5.0);

		camera.reset();
		assert!(camera.custom_bbox().is_none());
	}

	#[test]
	fn animation_ends_centered_on_target() {
		let mut camera = Camera::default();
		camera.animate_to(50.0, 20.0, 200.0, 100.0);
		while camera.advance(0.1) {}
		assert!(!camera.is_animating());
		assert_eq!(camera.graph_to_screen(50.0, 20.0), (100.0, 50.0));
	}

	#[test]
	fn zoom_keeps_anchor_fixed() {
		let mut camera = Camera::default();
		let before = camera.screen_to_graph(40.0, 30.0);
		camera.zoom_at(40.0, 30.0, ZOOM_STEP);
		assert_eq!(camera.screen_to_graph(40.0, 30.0), before);
	}
}
