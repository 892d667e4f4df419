use std::{collections::HashMap, fs, path::PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use deform_rs::{
    data::deserialize_vec3, ComponentDef, DeformMode, DeformSystem, Entity, MeshRegistry,
    SceneGraph, Sqt, TransformView,
};
use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Loads a scene, deforms it once, and prints where everything ended up.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to a JSON scene description.
    scene: PathBuf,

    /// Print the results as JSON instead of plain text.
    #[arg(long)]
    json: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct SceneDef {
    entities: Vec<EntityDef>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct EntityDef {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default, deserialize_with = "deserialize_vec3")]
    translation: Vec3,
    /// XYZ Euler angles in degrees.
    #[serde(default, deserialize_with = "deserialize_vec3")]
    rotation: Vec3,
    #[serde(default = "unit_scale", deserialize_with = "deserialize_vec3")]
    scale: Vec3,
    #[serde(default)]
    component: Option<ComponentDef>,
    #[serde(default)]
    mesh: Option<MeshDef>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct MeshDef {
    #[serde(default = "position_stride")]
    stride: usize,
    vertices: Vec<f32>,
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

fn position_stride() -> usize {
    3
}

impl EntityDef {
    fn local_sqt(&self) -> Sqt {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x.to_radians(),
            self.rotation.y.to_radians(),
            self.rotation.z.to_radians(),
        );
        Sqt::new(self.translation, rotation, self.scale)
    }
}

#[derive(Serialize, Debug)]
struct EntityReport {
    name: String,
    mode: DeformMode,
    deformed: bool,
    position: [f32; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    vertices: Option<Vec<[f32; 3]>>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let text = fs::read_to_string(&args.scene)
        .with_context(|| format!("could not read scene {}", args.scene.display()))?;
    let scene_def: SceneDef = serde_json::from_str(&text)
        .with_context(|| format!("could not parse scene {}", args.scene.display()))?;

    let mut scene = SceneGraph::new();
    let mut meshes = MeshRegistry::new();
    let mut system = DeformSystem::new();

    let mut entities: HashMap<&str, Entity> = HashMap::new();
    for def in &scene_def.entities {
        let parent = match &def.parent {
            Some(name) => match entities.get(name.as_str()) {
                Some(&parent) => Some(parent),
                None => bail!("{} is listed before its parent {}", def.name, name),
            },
            None => None,
        };
        if entities.contains_key(def.name.as_str()) {
            bail!("entity name {} is used twice", def.name);
        }

        let entity = scene.create_entity(def.local_sqt(), parent);
        entities.insert(def.name.as_str(), entity);
        log::debug!("Created {} as {}", def.name, entity);
    }

    for def in &scene_def.entities {
        let entity = entities[def.name.as_str()];
        if let Some(mesh) = &def.mesh {
            meshes.set_mesh(entity, mesh.vertices.clone(), mesh.stride);
        }
        if let Some(component) = &def.component {
            system
                .create(entity, component, &mut scene, &mut meshes)
                .with_context(|| format!("could not create component on {}", def.name))?;
        }
    }

    scene.update();

    let mut reports = Vec::with_capacity(scene_def.entities.len());
    for def in &scene_def.entities {
        let entity = entities[def.name.as_str()];
        let position = scene
            .world_from_entity(entity)
            .map(|world| world.transform_point3(Vec3::ZERO))
            .unwrap_or_default();
        let vertices = meshes.build_mesh(entity, &scene).map(|data| {
            let stride = def.mesh.as_ref().map_or(3, |mesh| mesh.stride.max(3));
            data.chunks(stride)
                .filter(|vertex| vertex.len() >= 3)
                .map(|vertex| [vertex[0], vertex[1], vertex[2]])
                .collect()
        });

        reports.push(EntityReport {
            name: def.name.clone(),
            mode: system.deform_mode(entity),
            deformed: system.is_deformed(entity),
            position: position.to_array(),
            vertices,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        let mode = format!("{:?}", report.mode);
        println!("{:<16} {:<14} position {:?}", report.name, mode, report.position);
        for vertex in report.vertices.iter().flatten() {
            println!("{:<16} {:<14} vertex   {:?}", "", "", vertex);
        }
    }

    Ok(())
}
