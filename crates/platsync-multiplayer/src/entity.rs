//! Capabilities the sync engine needs from a live game entity.
//!
//! The rendering/physics layer owns the real player object. It exposes a
//! position and scale through [`SyncEntity`], and optionally a velocity
//! through a [`PhysicsBody`]. Entities without a body (e.g. a remote
//! puppet driven purely by interpolation) simply return `None`.

/// A physics body whose velocity can be read and overwritten.
pub trait PhysicsBody {
    fn velocity(&self) -> (f64, f64);
    fn set_velocity(&mut self, velocity_x: f64, velocity_y: f64);
}

/// A positioned, scalable entity that may carry a physics body.
pub trait SyncEntity {
    fn position(&self) -> (f64, f64);
    fn set_position(&mut self, x: f64, y: f64);

    /// Non-uniform scale; uniform entities return the same value twice.
    fn scale(&self) -> (f64, f64);
    fn set_scale(&mut self, scale_x: f64, scale_y: f64);

    fn body(&self) -> Option<&dyn PhysicsBody> {
        None
    }

    fn body_mut(&mut self) -> Option<&mut dyn PhysicsBody> {
        None
    }
}

/// Plain velocity holder for entities whose physics lives elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KinematicBody {
    pub velocity_x: f64,
    pub velocity_y: f64,
}

impl PhysicsBody for KinematicBody {
    fn velocity(&self) -> (f64, f64) {
        (self.velocity_x, self.velocity_y)
    }

    fn set_velocity(&mut self, velocity_x: f64, velocity_y: f64) {
        self.velocity_x = velocity_x;
        self.velocity_y = velocity_y;
    }
}

/// Minimal concrete entity: position, scale, and an optional body.
#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub body: Option<KinematicBody>,
}

impl Avatar {
    /// Unit-scale avatar with a body at rest.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            scale_x: 1.0,
            scale_y: 1.0,
            body: Some(KinematicBody::default()),
        }
    }

    /// Unit-scale avatar with no physics body.
    pub fn without_body(x: f64, y: f64) -> Self {
        Self {
            body: None,
            ..Self::new(x, y)
        }
    }
}

impl SyncEntity for Avatar {
    fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    fn set_scale(&mut self, scale_x: f64, scale_y: f64) {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
    }

    fn body(&self) -> Option<&dyn PhysicsBody> {
        self.body.as_ref().map(|b| b as &dyn PhysicsBody)
    }

    fn body_mut(&mut self) -> Option<&mut dyn PhysicsBody> {
        self.body.as_mut().map(|b| b as &mut dyn PhysicsBody)
    }
}
