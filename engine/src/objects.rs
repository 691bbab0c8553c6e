use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Serializer};
use crate::intake::ImageResource;
use crate::types::{BoundingBox, Transform};

/// Session-unique object layer id. Never reused, even after removal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct LayerId(pub(crate) u64);

impl LayerId {
    pub fn raw(self) -> u64 { self.0 }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj-{}", self.0)
    }
}

impl FromStr for LayerId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix("obj-").and_then(|n| n.parse().ok()).map(LayerId).ok_or(())
    }
}

impl Serialize for LayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, Default)]
pub struct BaseLayer {
    pub image: Option<ImageResource>,
    pub transform: Transform,
}

impl BaseLayer {
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.image.as_ref().map(|img| BoundingBox::of(&self.transform, img.natural_size()))
    }
}

#[derive(Clone, Debug)]
pub struct ObjectLayer {
    pub id: LayerId,
    pub image: ImageResource,
    pub visible: bool,
    pub transform: Transform,
    /// Set once auto-fit has run; never cleared.
    pub initialized: bool,
}

impl ObjectLayer {
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::of(&self.transform, self.image.natural_size())
    }
}

/// Side-panel row for one object layer.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LayerSummary {
    pub id: LayerId,
    pub label: String,
    pub visible: bool,
    pub transform: Transform,
    pub display_rotation: f64,
    pub width: u32,
    pub height: u32,
}

impl LayerSummary {
    pub fn of(index: usize, layer: &ObjectLayer) -> Self {
        LayerSummary {
            id: layer.id,
            label: format!("Object {}", index + 1),
            visible: layer.visible,
            transform: layer.transform,
            display_rotation: layer.transform.display_rotation(),
            width: layer.image.width(),
            height: layer.image.height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_text_round_trip() {
        let id = LayerId(42);
        assert_eq!(id.to_string(), "obj-42");
        assert_eq!("obj-42".parse::<LayerId>(), Ok(id));
        assert!("base-image".parse::<LayerId>().is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"obj-42\"");
    }
}
