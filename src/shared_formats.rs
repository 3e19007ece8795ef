//! Value types shared by curves, poses and bindings.

use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};

use crate::{
    binary::BinaryReader,
    document::{Node, ToDocument},
    error::Result,
    field_plan::FieldPlan,
};

/// Class ids of the engine objects a clip refers to.
pub mod class_ids {
    pub const GAME_OBJECT: i32 = 1;
    pub const TRANSFORM: i32 = 4;
    pub const ANIMATION_CLIP: i32 = 74;
    pub const AVATAR: i32 = 90;
    pub const ANIMATOR: i32 = 95;
    pub const ANIMATION: i32 = 111;
    pub const MONO_BEHAVIOUR: i32 = 114;
    pub const MONO_SCRIPT: i32 = 115;
    pub const SKINNED_MESH_RENDERER: i32 = 137;
    pub const RECT_TRANSFORM: i32 = 224;
}

/// Scalar curve value
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Float(pub f32);

/// 3D vector with 32-bit floating point components
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

/// Quaternion with 32-bit floating point components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub center: Vector3,
    pub extent: Vector3,
}

/// Translation, rotation and scale
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct XForm {
    pub t: Vector3,
    pub q: Quaternion,
    pub s: Vector3,
}

/// Reference to another serialized object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PPtr {
    pub file_id: i32,
    pub path_id: i64,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    pub fn from_slice(v: &[f32]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Self {
            x: br.read_f32()?,
            y: br.read_f32()?,
            z: br.read_f32()?,
        })
    }

    /// Reads a 3-vector, or a 4-vector truncated to three components on
    /// layouts that padded positions to four floats.
    pub fn read_versioned<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        if plan.vector3_xform {
            Self::read_from(br)
        } else {
            let v = Vector4::read_from(br)?;
            Ok(Self::new(v.x, v.y, v.z))
        }
    }
}

impl Vector4 {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Self {
            x: br.read_f32()?,
            y: br.read_f32()?,
            z: br.read_f32()?,
            w: br.read_f32()?,
        })
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn splat(v: f32) -> Self {
        Self::new(v, v, v, v)
    }

    pub fn from_slice(v: &[f32]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }

    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Self {
            x: br.read_f32()?,
            y: br.read_f32()?,
            z: br.read_f32()?,
            w: br.read_f32()?,
        })
    }

    pub fn component(&self, index: usize) -> f32 {
        match index {
            0 => self.x,
            1 => self.y,
            2 => self.z,
            _ => self.w,
        }
    }

    pub fn set_component(&mut self, index: usize, value: f32) {
        match index {
            0 => self.x = value,
            1 => self.y = value,
            2 => self.z = value,
            _ => self.w = value,
        }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }
}

impl Aabb {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>) -> Result<Self> {
        Ok(Self {
            center: Vector3::read_from(br)?,
            extent: Vector3::read_from(br)?,
        })
    }
}

impl XForm {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        Ok(Self {
            t: Vector3::read_versioned(br, plan)?,
            q: Quaternion::read_from(br)?,
            s: Vector3::read_versioned(br, plan)?,
        })
    }
}

impl PPtr {
    pub fn read_from<R: Read + Seek>(br: &mut BinaryReader<R>, plan: &FieldPlan) -> Result<Self> {
        let file_id = br.read_i32()?;
        let path_id = if plan.pptr_path_id_64 {
            br.read_i64()?
        } else {
            br.read_i32()? as i64
        };
        Ok(Self { file_id, path_id })
    }

    pub fn is_null(&self) -> bool {
        self.path_id == 0
    }
}

impl ToDocument for Float {
    fn to_document(&self) -> Node {
        Node::Float(self.0)
    }
}

impl ToDocument for Vector3 {
    fn to_document(&self) -> Node {
        Node::mapping().add("x", self.x).add("y", self.y).add("z", self.z)
    }
}

impl ToDocument for Vector4 {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("x", self.x)
            .add("y", self.y)
            .add("z", self.z)
            .add("w", self.w)
    }
}

impl ToDocument for Quaternion {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("x", self.x)
            .add("y", self.y)
            .add("z", self.z)
            .add("w", self.w)
    }
}

impl ToDocument for Aabb {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("m_Center", self.center.to_document())
            .add("m_Extent", self.extent.to_document())
    }
}

impl ToDocument for XForm {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("t", self.t.to_document())
            .add("q", self.q.to_document())
            .add("s", self.s.to_document())
    }
}

impl ToDocument for PPtr {
    fn to_document(&self) -> Node {
        Node::mapping()
            .add("m_FileID", self.file_id)
            .add("m_PathID", self.path_id)
    }
}
