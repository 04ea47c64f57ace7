use crate::scene::materials::Rgb;
use crate::scene::{NodeId, SceneGraph, Transform};
use glam::{Quat, Vec3};

pub const CLIP_DURATION: f32 = 3.0;
const KEY_TIMES: [f32; 3] = [0.0, 1.0, 2.0];
const POSITION_OFFSET: Vec3 = Vec3::new(0.5, 0.0, 0.0);
const PEAK_SCALE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Discrete,
}

pub trait Interpolate: Copy {
    fn interpolate(from: Self, to: Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }
}

impl Interpolate for Vec3 {
    fn interpolate(from: Self, to: Self, t: f32) -> Self {
        from.lerp(to, t)
    }
}

impl Interpolate for Quat {
    fn interpolate(from: Self, to: Self, t: f32) -> Self {
        from.slerp(to, t)
    }
}

impl Interpolate for Rgb {
    fn interpolate(from: Self, to: Self, t: f32) -> Self {
        Vec3::from_array(from)
            .lerp(Vec3::from_array(to), t)
            .to_array()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack<T> {
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: Interpolation,
}

impl<T: Interpolate> KeyframeTrack<T> {
    pub fn new(times: &[f32], values: Vec<T>, interpolation: Interpolation) -> Self {
        debug_assert_eq!(times.len(), values.len());
        debug_assert!(!times.is_empty());
        Self {
            times: times.to_vec(),
            values,
            interpolation,
        }
    }

    /// Value at `time`; holds the first/last key outside the key range.
    pub fn sample(&self, time: f32) -> T {
        let last = self.values.len() - 1;
        if time <= self.times[0] {
            return self.values[0];
        }
        if time >= self.times[last] {
            return self.values[last];
        }
        let index = self
            .times
            .windows(2)
            .position(|pair| time >= pair[0] && time < pair[1])
            .unwrap_or(last - 1);
        match self.interpolation {
            Interpolation::Discrete => self.values[index],
            Interpolation::Linear => {
                let (t0, t1) = (self.times[index], self.times[index + 1]);
                let t = (time - t0) / (t1 - t0);
                T::interpolate(self.values[index], self.values[index + 1], t)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub transform: Transform,
    pub color: Rgb,
    pub opacity: f32,
}

/// Fixed five-track clip built around a rest transform.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub duration: f32,
    position: KeyframeTrack<Vec3>,
    scale: KeyframeTrack<Vec3>,
    rotation: KeyframeTrack<Quat>,
    color: KeyframeTrack<Rgb>,
    opacity: KeyframeTrack<f32>,
}

impl AnimationClip {
    pub fn keyframes(rest: &Transform) -> Self {
        let offset = rest.position + POSITION_OFFSET;
        let flipped = rest.rotation * Quat::from_axis_angle(Vec3::X, std::f32::consts::PI);
        Self {
            duration: CLIP_DURATION,
            position: KeyframeTrack::new(
                &KEY_TIMES,
                vec![rest.position, offset, rest.position],
                Interpolation::Linear,
            ),
            scale: KeyframeTrack::new(
                &KEY_TIMES,
                vec![rest.scale, rest.scale * PEAK_SCALE, rest.scale],
                Interpolation::Linear,
            ),
            rotation: KeyframeTrack::new(
                &KEY_TIMES,
                vec![rest.rotation, flipped, rest.rotation],
                Interpolation::Linear,
            ),
            color: KeyframeTrack::new(
                &KEY_TIMES,
                vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                Interpolation::Discrete,
            ),
            opacity: KeyframeTrack::new(&KEY_TIMES, vec![1.0, 0.0, 1.0], Interpolation::Linear),
        }
    }

    pub fn sample(&self, time: f32) -> Pose {
        Pose {
            transform: Transform {
                position: self.position.sample(time),
                rotation: self.rotation.sample(time).normalize(),
                scale: self.scale.sample(time),
            },
            color: self.color.sample(time),
            opacity: self.opacity.sample(time),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RestState {
    transform: Transform,
    color: Rgb,
    opacity: f32,
    transparent: bool,
}

/// Plays the clip on one node. Bound to that node for life; a replaced
/// node needs a new player.
#[derive(Debug, Clone)]
pub struct AnimationPlayer {
    clip: AnimationClip,
    target: NodeId,
    rest: RestState,
    time: f32,
    looping: bool,
}

impl AnimationPlayer {
    pub fn bind(scene: &SceneGraph, target: NodeId, looping: bool) -> Option<Self> {
        let node = scene.get(target)?;
        let material = &node.mesh()?.material;
        let rest = RestState {
            transform: node.transform,
            color: material.color,
            opacity: material.opacity,
            transparent: material.transparent,
        };
        Some(Self {
            clip: AnimationClip::keyframes(&node.transform),
            target,
            rest,
            time: 0.0,
            looping,
        })
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn is_finished(&self) -> bool {
        !self.looping && self.time >= self.clip.duration
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Adopts a swapped material's colour and opacity as the new rest values.
    pub fn rebase_material(&mut self, scene: &SceneGraph) {
        if let Some(material) = scene
            .get(self.target)
            .and_then(|node| node.mesh())
            .map(|mesh| &mesh.material)
        {
            self.rest.color = material.color;
            self.rest.opacity = material.opacity;
            self.rest.transparent = material.transparent;
        }
    }

    pub fn advance(&mut self, scene: &mut SceneGraph, dt: f32) {
        let duration = self.clip.duration;
        self.time = if self.looping {
            (self.time + dt.max(0.0)).rem_euclid(duration)
        } else {
            (self.time + dt.max(0.0)).min(duration)
        };
        let pose = self.clip.sample(self.time);
        let Some(node) = scene.get_mut(self.target) else {
            return;
        };
        node.transform = pose.transform;
        if let Some(mesh) = node.mesh_mut() {
            mesh.material.color = pose.color;
            mesh.material.opacity = pose.opacity;
            mesh.material.transparent = true;
        }
    }

    /// Puts the bound node back the way it was when the player was bound.
    pub fn restore(&self, scene: &mut SceneGraph) {
        let Some(node) = scene.get_mut(self.target) else {
            return;
        };
        node.transform = self.rest.transform;
        if let Some(mesh) = node.mesh_mut() {
            mesh.material.color = self.rest.color;
            mesh.material.opacity = self.rest.opacity;
            mesh.material.transparent = self.rest.transparent;
        }
    }
}
