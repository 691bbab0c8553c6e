use serde::{Serialize, Deserialize};
use kurbo::{Affine, Point, Vec2};

/// Uniform scale + rotation + translation, anchored at the element's top-left
/// corner before transformation. `rotation` is in degrees.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Transform { x: 0.0, y: 0.0, scale: 1.0, rotation: 0.0 }
    }
}

impl Transform {
    pub fn at(x: f64, y: f64) -> Self {
        Transform { x, y, ..Transform::default() }
    }

    /// Local image space to scene space: translate, then rotate, then scale.
    pub fn affine(&self) -> Affine {
        Affine::translate(Vec2::new(self.x, self.y))
            * Affine::rotate(self.rotation.to_radians())
            * Affine::scale(self.scale)
    }

    /// Rotation folded into `[0, 360)` for display.
    pub fn display_rotation(&self) -> f64 {
        let r = self.rotation.rem_euclid(360.0);
        if r >= 360.0 { 0.0 } else { r }
    }
}

/// Field-wise update; `None` leaves the field as it is.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub struct PartialTransform {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale: Option<f64>,
    pub rotation: Option<f64>,
}

impl PartialTransform {
    pub fn position(x: f64, y: f64) -> Self {
        PartialTransform { x: Some(x), y: Some(y), ..Default::default() }
    }

    pub fn full(t: Transform) -> Self {
        PartialTransform { x: Some(t.x), y: Some(t.y), scale: Some(t.scale), rotation: Some(t.rotation) }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.scale.is_none() && self.rotation.is_none()
    }

    /// Merges into `target`. Non-finite values and non-positive scales are
    /// dropped; returns false if anything was dropped.
    pub fn merge_into(&self, target: &mut Transform) -> bool {
        let mut clean = true;
        let mut set = |slot: &mut f64, value: Option<f64>, positive: bool| {
            if let Some(v) = value {
                if v.is_finite() && (!positive || v > 0.0) { *slot = v; } else { clean = false; }
            }
        };
        set(&mut target.x, self.x, false);
        set(&mut target.y, self.y, false);
        set(&mut target.scale, self.scale, true);
        set(&mut target.rotation, self.rotation, false);
        clean
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct SceneSize {
    pub width: f64,
    pub height: f64,
}

impl SceneSize {
    pub fn pixel_dims(&self) -> (u32, u32) {
        (self.width.round().max(1.0) as u32, self.height.round().max(1.0) as u32)
    }
}

/// Oriented box of a transformed element: `(x, y)` is the rotated top-left
/// corner, `width`/`height` are already scaled.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
}

impl BoundingBox {
    pub fn of(t: &Transform, natural: (u32, u32)) -> Self {
        BoundingBox {
            x: t.x,
            y: t.y,
            width: natural.0 as f64 * t.scale,
            height: natural.1 as f64 * t.scale,
            rotation: t.rotation,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Box-local point (unscaled, unrotated) to scene space.
    pub fn to_scene(&self, local: Point) -> Point {
        Affine::translate(Vec2::new(self.x, self.y)) * Affine::rotate(self.rotation.to_radians()) * local
    }

    pub fn to_local(&self, scene: Point) -> Point {
        Affine::rotate(-self.rotation.to_radians()) * (scene - self.origin()).to_point()
    }

    pub fn center(&self) -> Point {
        self.to_scene(Point::new(self.width / 2.0, self.height / 2.0))
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            self.to_scene(Point::new(0.0, 0.0)),
            self.to_scene(Point::new(self.width, 0.0)),
            self.to_scene(Point::new(self.width, self.height)),
            self.to_scene(Point::new(0.0, self.height)),
        ]
    }

    pub fn contains(&self, scene: Point) -> bool {
        let p = self.to_local(scene);
        p.x >= 0.0 && p.x <= self.width && p.y >= 0.0 && p.y <= self.height
    }

    /// Back to a transform for an image of the given natural width.
    pub fn to_transform(&self, natural_width: u32) -> Transform {
        Transform {
            x: self.x,
            y: self.y,
            scale: self.width / natural_width.max(1) as f64,
            rotation: self.rotation,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum HandleType {
    TopLeft, TopRight, BottomRight, BottomLeft,
    Rotate,
}

impl HandleType {
    pub const RESIZE: [HandleType; 4] = [HandleType::TopLeft, HandleType::TopRight, HandleType::BottomRight, HandleType::BottomLeft];

    /// Corner position in box-local space, `None` for the rotater.
    pub fn corner(self, width: f64, height: f64) -> Option<Point> {
        match self {
            HandleType::TopLeft => Some(Point::new(0.0, 0.0)),
            HandleType::TopRight => Some(Point::new(width, 0.0)),
            HandleType::BottomRight => Some(Point::new(width, height)),
            HandleType::BottomLeft => Some(Point::new(0.0, height)),
            HandleType::Rotate => None,
        }
    }

    pub fn opposite(self) -> HandleType {
        match self {
            HandleType::TopLeft => HandleType::BottomRight,
            HandleType::TopRight => HandleType::BottomLeft,
            HandleType::BottomRight => HandleType::TopLeft,
            HandleType::BottomLeft => HandleType::TopRight,
            HandleType::Rotate => HandleType::Rotate,
        }
    }
}
