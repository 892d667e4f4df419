use glam::Vec3;

use super::node::{PathId, Waypoint, WaypointPath};
use crate::{data::WaypointPathDef, DefinitionError};

// The unit vector from the first waypoint's authored position to the last one's.
fn parameterization_axis(def: &WaypointPathDef) -> Option<Vec3> {
    let (first, last) = match def.waypoints.as_slice() {
        [first, .., last] => (first, last),
        _ => return None,
    };

    let axis = (last.original_position - first.original_position).normalize_or_zero();
    (axis != Vec3::ZERO).then_some(axis)
}

/// Builds a path from its definition, projecting every waypoint's authored
/// position onto the axis running from the first waypoint to the last.
///
/// Waypoints are kept in authoring order. Projections that go backwards are
/// logged but not reordered.
pub fn build_waypoint_path(def: &WaypointPathDef) -> Result<WaypointPath, DefinitionError> {
    if def.waypoints.is_empty() {
        return Err(DefinitionError::EmptyPath(def.path_id.clone()));
    }
    let axis = parameterization_axis(def)
        .ok_or_else(|| DefinitionError::DegenerateAxis(def.path_id.clone()))?;

    let mut waypoints = Vec::with_capacity(def.waypoints.len());
    let mut parameterization_values = Vec::with_capacity(def.waypoints.len());
    for waypoint_def in &def.waypoints {
        let parameter_value = waypoint_def.original_position.dot(axis);
        if parameterization_values
            .last()
            .is_some_and(|&previous| parameter_value < previous)
        {
            log::warn!(
                "Waypoints of path {:?} aren't sorted along their parameterization axis",
                def.path_id
            );
        }

        parameterization_values.push(parameter_value);
        waypoints.push(Waypoint {
            remapped_position: waypoint_def.remapped_position,
            remapped_rotation: waypoint_def.remapped_rotation,
            parameter_value,
        });
    }

    Ok(WaypointPath {
        path_id: PathId::from_name(&def.path_id),
        parameterization_axis: axis,
        waypoints,
        parameterization_values,
    })
}

#[cfg(test)]
mod tests {
    use glam::vec3;

    use super::*;
    use crate::data::WaypointDef;

    fn waypoint(original: Vec3, remapped: Vec3) -> WaypointDef {
        WaypointDef {
            original_position: original,
            remapped_position: remapped,
            remapped_rotation: Vec3::ZERO,
        }
    }

    fn path(id: &str, waypoints: Vec<WaypointDef>) -> WaypointPathDef {
        WaypointPathDef {
            path_id: id.to_owned(),
            waypoints,
        }
    }

    #[test]
    fn test_parameterizes_along_first_to_last() {
        let def = path(
            "ramp",
            vec![
                waypoint(vec3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 0.0)),
                waypoint(vec3(0.0, 10.0, 0.0), vec3(1.0, 0.0, 0.0)),
                waypoint(vec3(0.0, 20.0, 0.0), vec3(3.0, 0.0, 0.0)),
            ],
        );
        let path = build_waypoint_path(&def).unwrap();

        assert_eq!(path.path_id, PathId::from_name("ramp"));
        assert!(path.parameterization_axis.abs_diff_eq(Vec3::Y, 1e-6));
        assert_eq!(path.parameterization_values, vec![0.0, 10.0, 20.0]);
        assert_eq!(path.waypoints[2].remapped_position, vec3(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_unsorted_waypoints_are_kept() {
        let def = path(
            "zigzag",
            vec![
                waypoint(vec3(0.0, 0.0, 0.0), Vec3::ZERO),
                waypoint(vec3(15.0, 0.0, 0.0), Vec3::ONE),
                waypoint(vec3(5.0, 0.0, 0.0), Vec3::ONE),
                waypoint(vec3(10.0, 0.0, 0.0), Vec3::ZERO),
            ],
        );
        let path = build_waypoint_path(&def).unwrap();

        assert_eq!(path.waypoints.len(), 4);
        assert_eq!(path.parameterization_values, vec![0.0, 15.0, 5.0, 10.0]);
    }

    #[test]
    fn test_rejects_unusable_paths() {
        assert_eq!(
            build_waypoint_path(&path("empty", Vec::new())),
            Err(DefinitionError::EmptyPath("empty".to_owned()))
        );
        assert_eq!(
            build_waypoint_path(&path("single", vec![waypoint(Vec3::ONE, Vec3::ONE)])),
            Err(DefinitionError::DegenerateAxis("single".to_owned()))
        );
        assert_eq!(
            build_waypoint_path(&path(
                "loop",
                vec![waypoint(Vec3::ONE, Vec3::ZERO), waypoint(Vec3::ONE, Vec3::ONE)]
            )),
            Err(DefinitionError::DegenerateAxis("loop".to_owned()))
        );
    }
}
