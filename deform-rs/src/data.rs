use glam::Vec3;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DeformMode {
    #[default]
    None,
    /// Legacy mode: every object is placed on one cylinder around the world Y axis.
    GlobalCylinder,
    /// Bends the deformer's subtree around a cylinder in front of the deformer.
    CylinderBend,
    /// Remaps the subtree along a piecewise linear path.
    Waypoint,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeformerDef {
    #[serde(default)]
    pub deform_mode: DeformMode,
    #[serde(default)]
    pub horizontal_radius: f32,
    /// Radians, zero or less disables clamping.
    #[serde(default)]
    pub clamp_angle: f32,
    #[serde(default)]
    pub waypoint_paths: Vec<WaypointPathDef>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WaypointPathDef {
    #[serde(default)]
    pub path_id: String,
    #[serde(default)]
    pub waypoints: Vec<WaypointDef>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WaypointDef {
    #[serde(default, deserialize_with = "deserialize_vec3")]
    pub original_position: Vec3,
    #[serde(default, deserialize_with = "deserialize_vec3")]
    pub remapped_position: Vec3,
    /// Euler angles in degrees.
    #[serde(default, deserialize_with = "deserialize_vec3")]
    pub remapped_rotation: Vec3,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeformedDef {
    pub waypoint_path_id: Option<String>,
}

/// Any definition the deform system knows how to create a component from.
#[derive(Clone, Debug, Deserialize)]
pub enum ComponentDef {
    Deformer(DeformerDef),
    Deformed(DeformedDef),
}

pub fn deserialize_vec3<'de, D>(deserializer: D) -> Result<Vec3, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct Vec3Upper {
        #[serde(default)]
        x: f32,
        #[serde(default)]
        y: f32,
        #[serde(default)]
        z: f32,
    }
    let res = Vec3Upper::deserialize(deserializer)?;

    Ok(Vec3::new(res.x, res.y, res.z))
}
