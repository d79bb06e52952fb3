//! Scene loading
//!
//! Turns a level file into registry entities, rapier bodies and the GPU-side
//! scene description:
//!
//! 1. Read every record and resolve its collision shape. Records that fail are
//!    logged and skipped so the rest of the scene still loads.
//! 2. Group the surviving records by entity type in sorted order. A type's
//!    instance block starts at the running instance total, and its entities get
//!    consecutive instance ids in file order.
//! 3. Parse each type's model once and append one draw per sub-mesh to the batch
//!    of its material class, drawing every instance of the type.
//!
//! The transform buffer is filled in the same type and id order, so an entity's
//! [`GeometryInstance::slot`] always addresses its own matrix.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use log::{debug, error, info};
use rapier3d::prelude::SharedShape;

use super::catalogue::{self, Archetype, Placement, DEFAULT_FRICTION, ROOM_MODEL};
use super::level::{Level, LevelRecord};
use super::materials::MtlData;
use super::obj_loader::{ObjLoader, ObjModel};
use super::texture::PixelFormat;
use crate::ecs::components::{
    CrtDisplay, EntityType, GeometryInstance, ShapeKind, Transform, TransformFactory,
};
use crate::ecs::World;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::physics::{BodyDesc, PhysicsWorld, ShapeCache};
use crate::render::{
    BackgroundQuad, BatchSet, InstanceTransform, MaterialClass, SubMeshMaterial, TextureTable, Vertex,
    BACKGROUND_TEXTURE,
};

/// Directory material textures resolve against, relative to the asset root
const TEXTURE_DIR: &str = "models";

/// Room shell drawn into the stencil buffer
#[derive(Debug, Clone, Default)]
pub struct StencilMesh {
    /// Vertices of every sub-mesh
    pub vertices: Vec<Vertex>,
    /// Indices into `vertices`
    pub indices: Vec<u32>,
    /// Placement of the shell
    pub model: Mat4,
}

/// Instance block of one entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceRange {
    /// First slot in the transform buffer
    pub base: u32,
    /// Number of instances
    pub count: u32,
}

/// Everything the renderer needs from a loaded level
#[derive(Debug, Clone)]
pub struct SceneGeometry {
    /// Draw batches by material class
    pub batches: BatchSet,
    /// Initial model matrix of every instance, in slot order
    pub instance_transforms: Vec<InstanceTransform>,
    /// Bindless texture table
    pub textures: TextureTable,
    /// Stencil room shell, if the level places one
    pub room: Option<StencilMesh>,
    /// Scrolling foreground quad
    pub background: BackgroundQuad,
    /// Emissive draw id of each display type
    pub display_draws: BTreeMap<String, u32>,
    /// Instance block of each entity type
    pub instances: BTreeMap<String, InstanceRange>,
}

impl SceneGeometry {
    /// Total instance count
    pub fn instance_count(&self) -> usize {
        self.instance_transforms.len()
    }
}

struct Spawn {
    archetype: &'static Archetype,
    shape: SharedShape,
    position: Vec3,
    yaw: f32,
}

/// Loads levels relative to an asset root
pub struct SceneLoader {
    asset_root: PathBuf,
    shapes: ShapeCache,
}

impl SceneLoader {
    /// Loader for assets under `asset_root`
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            asset_root: asset_root.into(),
            shapes: ShapeCache::new(),
        }
    }

    /// Asset root
    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Load `level_file` into the registry and physics world
    ///
    /// Never fails: a missing level yields an empty scene and broken records,
    /// models or textures are logged and left out.
    pub fn load(&mut self, level_file: &str, world: &mut World, physics: &mut PhysicsWorld) -> SceneGeometry {
        let level = Level::load(self.asset_root.join(level_file)).unwrap_or_else(|e| {
            error!("{}", e);
            Level::from_source("")
        });

        let mut spawns: BTreeMap<String, Vec<Spawn>> = BTreeMap::new();
        let mut room_model = None;
        let mut display_count = 0u32;

        for record in level.records() {
            match record {
                Err(e) => {
                    error!("Level {}: {}", level_file, e);
                    continue;
                }
                Ok(LevelRecord::Wall { position, half_extents }) => {
                    self.spawn_wall(position, half_extents, world, physics);
                }
                Ok(LevelRecord::Entity { keyword, position, yaw }) => match catalogue::lookup(&keyword) {
                    Placement::Room => room_model = Some(Mat4::from_translation_yaw(position, yaw)),
                    Placement::Unknown => debug!("Skipping unknown level keyword '{}'", keyword),
                    Placement::Prop(archetype) => {
                        let shape = match self.shapes.resolve(&archetype.collider, &self.asset_root) {
                            Ok(shape) => shape,
                            Err(e) => {
                                error!("Skipping {}: {}", keyword, e);
                                continue;
                            }
                        };
                        let type_name = if archetype.display {
                            display_count += 1;
                            format!("{}{}", EntityType::DISPLAY_PREFIX, display_count - 1)
                        } else {
                            keyword
                        };
                        let yaw = if archetype.applies_yaw { yaw } else { 0.0 };
                        spawns.entry(type_name).or_default().push(Spawn { archetype, shape, position, yaw });
                    }
                },
            }
        }

        let mut geometry = SceneGeometry {
            batches: BatchSet::new(),
            instance_transforms: Vec::new(),
            textures: TextureTable::new(),
            room: None,
            background: BackgroundQuad::new(0),
            display_draws: BTreeMap::new(),
            instances: BTreeMap::new(),
        };
        let mut models: HashMap<&'static str, Option<ObjModel>> = HashMap::new();

        for (type_name, group) in spawns {
            let range = InstanceRange {
                base: geometry.instance_transforms.len() as u32,
                count: group.len() as u32,
            };
            let model_path = group[0].archetype.model;

            for (instance_id, spawn) in group.into_iter().enumerate() {
                let transform = self.spawn_prop(&type_name, range.base, instance_id as u32, &spawn, world, physics);
                geometry.instance_transforms.push((*transform.model()).into());
            }

            let model = models
                .entry(model_path)
                .or_insert_with(|| self.load_model(model_path));
            if let Some(model) = model {
                self.push_draws(&type_name, model, range, &mut geometry);
            }
            geometry.instances.insert(type_name, range);
        }

        if let Some(placement) = room_model {
            geometry.room = self.load_room(placement);
        }

        let background_slot = geometry.textures.get_or_load(
            BACKGROUND_TEXTURE,
            &self.asset_root.join(BACKGROUND_TEXTURE),
            PixelFormat::Rgba,
        );
        geometry.background = BackgroundQuad::new(background_slot);

        info!(
            "Loaded {}: {} entities, {} instances in {} types, {} textures",
            level_file,
            world.entity_count(),
            geometry.instance_count(),
            geometry.instances.len(),
            geometry.textures.len()
        );
        for (type_name, range) in &geometry.instances {
            debug!("  {} -> instances [{}, {})", type_name, range.base, range.base + range.count);
        }
        for batch in geometry.batches.iter() {
            info!("  {:?} batch: {} draw commands", batch.class(), batch.commands().len());
        }

        geometry
    }

    /// Model texture table slot for `name`, loading it on first use
    pub fn texture_slot(&self, textures: &mut TextureTable, name: &str, format: PixelFormat) -> u32 {
        textures.get_or_load(name, &self.asset_root.join(TEXTURE_DIR).join(name), format)
    }

    fn spawn_prop(
        &self,
        type_name: &str,
        base_instance: u32,
        instance_id: u32,
        spawn: &Spawn,
        world: &mut World,
        physics: &mut PhysicsWorld,
    ) -> Transform {
        let archetype = spawn.archetype;
        let entity = world.create_entity();
        let body = physics.add_body(
            entity,
            &BodyDesc {
                shape: spawn.shape.clone(),
                kind: archetype.collider.kind(),
                mass: archetype.mass,
                friction: archetype.friction,
                position: spawn.position,
                yaw: spawn.yaw,
            },
        );
        let transform = TransformFactory::placed(spawn.position, spawn.yaw);

        world.add_component(entity, EntityType::new(type_name));
        world.add_component(entity, GeometryInstance { base_instance, instance_id });
        world.add_component(entity, body);
        world.add_component(entity, transform.clone());
        if archetype.display {
            world.add_component(entity, CrtDisplay);
        }
        transform
    }

    fn spawn_wall(&self, position: Vec3, half_extents: Vec3, world: &mut World, physics: &mut PhysicsWorld) {
        let entity = world.create_entity();
        let body = physics.add_body(
            entity,
            &BodyDesc {
                shape: SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z),
                kind: ShapeKind::Box,
                mass: 0.0,
                friction: DEFAULT_FRICTION,
                position,
                yaw: 0.0,
            },
        );
        world.add_component(entity, body);
    }

    fn load_model(&self, relative: &str) -> Option<ObjModel> {
        match ObjLoader::load(self.asset_root.join(relative)) {
            Ok(model) => Some(model),
            Err(e) => {
                error!("Model {}: {}", relative, e);
                None
            }
        }
    }

    fn push_draws(&self, type_name: &str, model: &ObjModel, range: InstanceRange, geometry: &mut SceneGeometry) {
        for sub_mesh in &model.sub_meshes {
            let (class, material) = self.classify(model.material_of(sub_mesh), &mut geometry.textures);
            let draw_id = geometry.batches.get_mut(class).push_sub_mesh(
                &sub_mesh.vertices,
                &sub_mesh.indices,
                range.count,
                range.base,
                material,
            );

            if class == MaterialClass::Emissive && EntityType::new(type_name).is_display() {
                geometry.display_draws.entry(type_name.to_string()).or_insert(draw_id);
            }
        }
    }

    /// Material class of a sub-mesh
    ///
    /// No diffuse map means flat color; an emission map marks the diffuse texture
    /// as self-lit.
    fn classify(&self, material: Option<&MtlData>, textures: &mut TextureTable) -> (MaterialClass, SubMeshMaterial) {
        let Some(material) = material else {
            return (MaterialClass::Flat, SubMeshMaterial::Color(MtlData::default().flat_color()));
        };
        let Some(diffuse_map) = &material.diffuse_map else {
            return (MaterialClass::Flat, SubMeshMaterial::Color(material.flat_color()));
        };

        let slot = self.texture_slot(textures, diffuse_map, PixelFormat::Rgb);
        let class = if material.emission_map.is_some() {
            MaterialClass::Emissive
        } else {
            MaterialClass::Textured
        };
        (class, SubMeshMaterial::Texture(slot))
    }

    fn load_room(&self, placement: Mat4) -> Option<StencilMesh> {
        let model = self.load_model(ROOM_MODEL)?;
        let mut mesh = StencilMesh {
            model: placement,
            ..Default::default()
        };
        for sub_mesh in &model.sub_meshes {
            let offset = mesh.vertices.len() as u32;
            mesh.vertices.extend_from_slice(&sub_mesh.vertices);
            mesh.indices.extend(sub_mesh.indices.iter().map(|i| i + offset));
        }
        Some(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsSettings;
    use crate::ecs::components::PhysicsBody;
    use crate::render::FALLBACK_SLOT;
    use approx::assert_relative_eq;
    use std::fs;

    const CUBE_FACES: &str = "v -1 -1 -1\nv 1 -1 -1\nv 1 1 -1\nv -1 1 -1\nv -1 -1 1\nv 1 -1 1\nv 1 1 1\nv -1 1 1\n\
vt 0 0\nvt 1 0\nvt 1 1\nvt 0 1\nvn 0 0 1\n";

    fn write_fixture(name: &str, level: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("room_engine_scene_{}", name));
        let models = root.join("models");
        fs::create_dir_all(models.join("textures")).unwrap();

        fs::write(models.join("book.mtl"), "newmtl Cover\nKd 0.5 0.25 0.125\n").unwrap();
        fs::write(
            models.join("book.obj"),
            format!("mtllib book.mtl\n{}o Book\nusemtl Cover\nf 1/1/1 2/2/1 3/3/1 4/4/1\n", CUBE_FACES),
        )
        .unwrap();

        image::RgbImage::from_pixel(2, 2, image::Rgb([200, 10, 10])).save(models.join("case.png")).unwrap();
        image::RgbImage::from_pixel(2, 2, image::Rgb([10, 200, 10])).save(models.join("screen.png")).unwrap();
        image::RgbaImage::from_pixel(2, 4, image::Rgba([0, 0, 0, 0])).save(models.join("textures/bg.png")).unwrap();
        fs::write(
            models.join("crt.mtl"),
            "newmtl Case\nKd 1 1 1\nmap_Kd case.png\nnewmtl Screen\nKd 1 1 1\nmap_Kd screen.png\nmap_Ke screen.png\n",
        )
        .unwrap();
        fs::write(
            models.join("crt.obj"),
            format!(
                "mtllib crt.mtl\n{}o Case\nusemtl Case\nf 1/1/1 2/2/1 3/3/1\nf 1/1/1 3/3/1 4/4/1\no Screen\nusemtl Screen\nf 5/1/1 6/2/1 7/3/1\n",
                CUBE_FACES
            ),
        )
        .unwrap();
        fs::write(models.join("room.obj"), format!("{}o A\nf 1 2 3\no B\nf 5 6 7\n", CUBE_FACES)).unwrap();

        fs::write(root.join("level.txt"), level).unwrap();
        root
    }

    fn load(root: &Path) -> (World, PhysicsWorld, SceneGeometry) {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let geometry = SceneLoader::new(root).load("level.txt", &mut world, &mut physics);
        (world, physics, geometry)
    }

    #[test]
    fn test_single_book() {
        let root = write_fixture("book", "book 0,0,0 0.0\n");
        let (world, physics, geometry) = load(&root);

        let books: Vec<_> = world.query::<EntityType>().filter(|(_, t)| t.as_str() == "book").collect();
        assert_eq!(books.len(), 1);
        let entity = books[0].0;

        let body = world.get_component::<PhysicsBody>(entity).unwrap();
        assert_eq!(body.shape, ShapeKind::Box);
        assert!(physics.is_dynamic(body.body));
        assert_relative_eq!(physics.body_mass(body.body).unwrap(), 0.5, epsilon = 1e-5);

        let transform = world.get_component::<Transform>(entity).unwrap();
        assert_relative_eq!(*transform.model(), Mat4::identity());

        let flat = geometry.batches.get(MaterialClass::Flat);
        assert_eq!(flat.commands().len(), 1);
        assert_eq!(flat.commands()[0].index_count, 6);
        assert_eq!(flat.colors(), &[[0.5, 0.25, 0.125, 1.0]]);
    }

    #[test]
    fn test_instances_are_contiguous_per_type() {
        let level = "monitor 0,0,0 0 book 1,0,0 0 book 2,0,0 0 mug 0,3,0 0 book 3,0,0 1.5 monitor 5,0,0 0\n";
        let root = write_fixture("layout", level);
        let (world, _, geometry) = load(&root);

        // Sorted order: book, crt0, crt1; mug has no model in the fixture
        assert_eq!(geometry.instances["book"], InstanceRange { base: 0, count: 3 });
        assert_eq!(geometry.instances["crt0"], InstanceRange { base: 3, count: 1 });
        assert_eq!(geometry.instances["crt1"], InstanceRange { base: 4, count: 1 });
        assert_eq!(geometry.instances["mug"], InstanceRange { base: 5, count: 1 });
        assert_eq!(geometry.instance_count(), 6);

        let mut book_ids: Vec<u32> = Vec::new();
        for (entity, instance) in world.query::<GeometryInstance>() {
            let entity_type = world.get_component::<EntityType>(entity).unwrap();
            let range = geometry.instances[entity_type.as_str()];
            assert_eq!(instance.base_instance, range.base);
            if entity_type.as_str() == "book" {
                book_ids.push(instance.instance_id);
            }
            let model = world.get_component::<Transform>(entity).unwrap().model();
            let expected: InstanceTransform = (*model).into();
            assert_eq!(geometry.instance_transforms[instance.slot() as usize], expected);
        }
        book_ids.sort_unstable();
        assert_eq!(book_ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_draw_commands_per_class_and_displays() {
        let root = write_fixture("displays", "monitor 0,0,0 0 monitor 5,0,0 0 book 0,0,0 0\n");
        let (world, _, geometry) = load(&root);

        let textured = geometry.batches.get(MaterialClass::Textured);
        let emissive = geometry.batches.get(MaterialClass::Emissive);
        assert_eq!(textured.commands().len(), 2);
        assert_eq!(emissive.commands().len(), 2);

        // crt0 then crt1; both share one parsed model but each gets its own draws
        let second = emissive.commands()[1];
        assert_eq!(second.first_instance, geometry.instances["crt1"].base);
        assert_eq!(second.instance_count, 1);
        assert_eq!(second.first_index, 3);
        assert_eq!(second.vertex_offset, 3);
        assert_eq!(geometry.display_draws["crt0"], 0);
        assert_eq!(geometry.display_draws["crt1"], 1);

        // Same texture file shares a slot across both monitors
        assert_eq!(textured.textures().as_slice()[0], textured.textures().as_slice()[1]);
        assert_ne!(emissive.textures().as_slice()[0], FALLBACK_SLOT);
        assert_eq!(world.count::<CrtDisplay>(), 2);
    }

    #[test]
    fn test_walls_room_and_unknown_keywords() {
        let root = write_fixture("walls", "wall 0,0,-10 5,5,1 room 0,0,0 0 lamp 1,1,1 0 book 0,2,0 0\n");
        let (world, physics, geometry) = load(&root);

        assert_eq!(world.count::<PhysicsBody>(), 2);
        assert_eq!(world.count::<EntityType>(), 1);
        assert_eq!(world.count::<Transform>(), 1);
        // Wall and book plus the drag anchor
        assert_eq!(physics.body_count(), 3);

        let room = geometry.room.unwrap();
        assert_eq!(room.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_ne!(geometry.background.texture_slot(), FALLBACK_SLOT);
    }

    #[test]
    fn test_bad_record_does_not_end_the_level() {
        let root = write_fixture("bad_record", "room 0,0,0 book 0,x,0 0 book 1,0,0 book 2,0,0 0.5\n");
        let (world, _, geometry) = load(&root);

        assert!(geometry.room.is_some());
        assert_eq!(world.count::<PhysicsBody>(), 2);
        assert_eq!(geometry.instances["book"], InstanceRange { base: 0, count: 2 });
    }

    #[test]
    fn test_missing_level_is_empty_scene() {
        let root = std::env::temp_dir().join("room_engine_scene_missing");
        let (world, _, geometry) = load(&root);
        assert_eq!(world.entity_count(), 0);
        assert_eq!(geometry.instance_count(), 0);
        assert_eq!(geometry.batches.command_count(), 0);
        assert_eq!(geometry.background.texture_slot(), FALLBACK_SLOT);
    }
}
