//! Static set dressing: floor, house, bushes, sun, moon and the title text.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, TAU};

use glam::{Quat, Vec3};
use rand::Rng;

use crate::assets::AssetLoader;
use crate::config::{hex_rgb, SceneConfig, TextConfig};
use crate::model::geometry;
use crate::model::geometry::TextParams;
use crate::model::material::{Material, MaterialId, Resources, TextureId, Wrap};
use crate::model::scene::{NodeId, SceneGraph, Shadows, Transform, Visual};
use crate::model::stars::random_floor;
use crate::model::typeface::Typeface;

/// Nodes the update loop moves after construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Yard {
    pub ground: NodeId,
    pub house: NodeId,
    pub door: NodeId,
    pub bushes: NodeId,
    pub moon: NodeId,
    pub sun: NodeId,
    pub star_texture: TextureId,
    /// Matcap material for the text, which waits on the typeface.
    pub text_material: MaterialId,
}

fn texture(resources: &mut Resources, loader: &dyn AssetLoader, path: &str, wrap: Wrap) -> TextureId {
    let id = resources.reserve_texture(path, wrap);
    loader.load_texture(path, id);
    id
}

/// Build the yard under the scene root. Textures are requested through
/// `loader` and show up when their loads complete.
pub fn build<R: Rng>(
    scene: &mut SceneGraph,
    resources: &mut Resources,
    loader: &dyn AssetLoader,
    config: &SceneConfig,
    rng: &mut R,
) -> Yard {
    let paths = &config.assets;

    // Floor, tiled 8x8
    let floor_map = texture(resources, loader, &paths.floor_color, Wrap::Repeat);
    let mut floor_material = Material::lit("floor", Some(floor_map));
    floor_material.uv_repeat = [8.0, 8.0];
    let floor_material = resources.add_material(floor_material);
    let floor_mesh = resources.add_mesh(geometry::plane(25.0, 25.0, 1, 1));
    let ground = scene.add(
        SceneGraph::ROOT,
        "ground",
        Transform::default().with_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
        Visual::Mesh { mesh: floor_mesh, material: floor_material },
    );
    scene.set_shadows(ground, Shadows::RECEIVE);

    // House
    let house = scene.add_group(SceneGraph::ROOT, "house", Transform::default());
    let wood_map = texture(resources, loader, &paths.wood_color, Wrap::Clamp);
    let wood = resources.add_material(Material::lit("wood", Some(wood_map)));

    let walls_mesh = resources.add_mesh(geometry::cuboid(5.0, 3.0, 5.0));
    let walls = scene.add(
        house,
        "walls",
        Transform::from_translation(Vec3::new(0.0, 3.0 / 2.0, 0.0)),
        Visual::Mesh { mesh: walls_mesh, material: wood },
    );
    scene.set_shadows(walls, Shadows::CAST);

    let roof_mesh = resources.add_mesh(geometry::cone(4.0, 2.0, 4));
    scene.add(
        house,
        "roof",
        Transform::from_translation(Vec3::new(0.0, 4.0, 0.0)).with_rotation(Quat::from_rotation_y(FRAC_PI_4)),
        Visual::Mesh { mesh: roof_mesh, material: wood },
    );

    let door_map = texture(resources, loader, &paths.door_color, Wrap::Clamp);
    let door_alpha = texture(resources, loader, &paths.door_alpha, Wrap::Clamp);
    let mut door_material = Material::lit("door", Some(door_map));
    door_material.alpha_map = Some(door_alpha);
    door_material.transparent = true;
    let door_material = resources.add_material(door_material);
    let door_mesh = resources.add_mesh(geometry::plane(2.0, 2.5, 1, 1));
    let door = scene.add(
        house,
        "door",
        Transform::from_translation(Vec3::new(0.0, 2.25 / 2.0, 5.0 / 2.0 + 0.01)),
        Visual::Mesh { mesh: door_mesh, material: door_material },
    );

    // Bushes share one wireframe triangle soup
    let bushes = scene.add_group(SceneGraph::ROOT, "bushes", Transform::default());
    let soup = geometry::triangle_soup(100, rng).to_wireframe();
    let bush_mesh = resources.add_mesh(soup);
    let bush_material = resources.add_material(Material::basic("bush", hex_rgb(0x2b8209)));
    for _ in 0..config.bush_count {
        let angle = rng.gen::<f32>() * TAU;
        let radius = 4.0 + rng.gen::<f32>() * 8.0;
        let scale = random_floor(rng, 0.5, 1.5);
        let bush = scene.add(
            bushes,
            "bush",
            Transform::from_translation(Vec3::new(angle.sin() * radius, 0.0, angle.cos() * radius)).with_scale(scale),
            Visual::Lines { mesh: bush_mesh, material: bush_material },
        );
        scene.set_shadows(bush, Shadows::CAST);
    }

    // Sun and moon; their positions are set every frame
    let sphere = resources.add_mesh(geometry::sphere(1.0, 32, 16));
    let moon_material = resources.add_material(Material::basic("moon", hex_rgb(0xe0dcda)));
    let sun_material = resources.add_material(Material::basic("sun", hex_rgb(0xfacc61)));
    let moon = scene.add(
        SceneGraph::ROOT,
        "moon",
        Transform::default(),
        Visual::Mesh { mesh: sphere, material: moon_material },
    );
    let sun = scene.add(
        SceneGraph::ROOT,
        "sun",
        Transform::default(),
        Visual::Mesh { mesh: sphere, material: sun_material },
    );

    let star_texture = texture(resources, loader, &paths.star, Wrap::Clamp);

    let matcap = texture(resources, loader, &paths.text_matcap, Wrap::Clamp);
    let text_material = resources.add_material(Material::matcap("text", matcap));
    loader.load_font(&paths.font);

    tracing::info!(nodes = scene.len(), meshes = resources.meshes.len(), "yard built");

    Yard { ground, house, door, bushes, moon, sun, star_texture, text_material }
}

/// Extrude `config.content` in `font` and stand it in the yard.
pub fn add_text(
    scene: &mut SceneGraph,
    resources: &mut Resources,
    yard: &Yard,
    font: &Typeface,
    config: &TextConfig,
) -> NodeId {
    let params = TextParams {
        size: config.size,
        depth: config.depth,
        curve_segments: config.curve_segments,
        bevel_size: config.bevel_size,
    };
    let mesh = geometry::text(font, &config.content, &params);
    tracing::info!(text = %config.content, family = %font.family_name, vertices = mesh.vertices.len(), "text built");
    let mesh = resources.add_mesh(mesh);
    let text = scene.add(
        SceneGraph::ROOT,
        "text",
        Transform::from_translation(config.position).with_rotation(Quat::from_rotation_y(config.yaw)),
        Visual::Mesh { mesh, material: yard.text_material },
    );
    scene.set_shadows(text, Shadows::CAST);
    text
}

/// Material used for the star sprites.
pub fn star_material(star_texture: TextureId) -> Material {
    let mut material = Material::basic("stars", [1.0, 1.0, 1.0]);
    material.map = Some(star_texture);
    material.alpha_test = 0.001;
    material
}
