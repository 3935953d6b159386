//! Texture, typeface and glTF loading.
//!
//! Loads run as detached futures and report into an [`AssetInbox`] which the
//! frame loop drains before simulating, so completions never touch scene
//! state from inside a callback.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;

use glam::{Mat4, Quat, Vec3};
use gltf::animation::util::ReadOutputs;

use crate::error::AssetError;
use crate::model::animation::{AnimationClip, Channel, Interpolation, Keyframes};
use crate::model::material::{Image, Material, MaterialId, MeshId, Resources, TextureId, Wrap};
use crate::model::scene::{NodeId, SceneGraph, Skin, SkinId, Transform, Visual};
use crate::model::typeface::Typeface;
use crate::utils::{Mesh, Vertex};

#[cfg(target_arch = "wasm32")]
pub async fn load_binary(path: &str) -> Result<Vec<u8>, AssetError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let fail = |reason: String| AssetError::Fetch { path: path.to_string(), reason };
    let window = web_sys::window().ok_or_else(|| fail("no global `window`".into()))?;
    let response = JsFuture::from(window.fetch_with_str(path))
        .await
        .map_err(|e| fail(format!("{e:?}")))?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|_| fail("fetch did not return a Response".into()))?;
    if !response.ok() {
        return Err(fail(format!("HTTP {}", response.status())));
    }
    let buffer = response.array_buffer().map_err(|e| fail(format!("{e:?}")))?;
    let buffer = JsFuture::from(buffer).await.map_err(|e| fail(format!("{e:?}")))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

/// Natively, web paths resolve under `./assets`.
#[cfg(not(target_arch = "wasm32"))]
pub fn native_path(path: &str) -> std::path::PathBuf {
    std::path::Path::new("./")
        .join("assets")
        .join(path.trim_start_matches('/'))
}

#[cfg(not(target_arch = "wasm32"))]
pub fn read_binary(path: &str) -> Result<Vec<u8>, AssetError> {
    std::fs::read(native_path(path)).map_err(|e| AssetError::Fetch {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn load_binary(path: &str) -> Result<Vec<u8>, AssetError> {
    read_binary(path)
}

/// Resolve a glTF-relative uri against the path of the file that names it.
pub fn resolve_uri(base: &str, uri: &str) -> Result<String, AssetError> {
    if uri.starts_with("data:") {
        return Err(AssetError::UnsupportedUri {
            path: base.to_string(),
            uri: uri.chars().take(32).collect(),
        });
    }
    let uri = uri.replace("%20", " ");
    Ok(match base.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{uri}"),
        None => uri,
    })
}

pub fn decode_image(path: &str, bytes: &[u8]) -> Result<Image, AssetError> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|source| AssetError::Image { path: path.to_string(), source })?
        .to_rgba8();
    Ok(Image {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

pub async fn load_texture(path: &str) -> Result<Image, AssetError> {
    let bytes = load_binary(path).await?;
    decode_image(path, &bytes)
}

pub async fn load_font(path: &str) -> Result<Typeface, AssetError> {
    let bytes = load_binary(path).await?;
    Typeface::from_json(path, &bytes)
}

pub struct ModelNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub children: Vec<usize>,
}

pub struct ModelPrimitive {
    pub mesh: Mesh,
    pub material: Option<usize>,
}

pub struct ModelMaterial {
    pub name: String,
    pub color: [f32; 4],
    pub texture: Option<usize>,
    pub transparent: bool,
}

pub struct ModelSkin {
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
}

/// A parsed glTF file, not yet registered with any scene resources.
pub struct ModelAsset {
    pub path: String,
    pub nodes: Vec<ModelNode>,
    pub roots: Vec<usize>,
    pub meshes: Vec<Vec<ModelPrimitive>>,
    pub materials: Vec<ModelMaterial>,
    pub images: Vec<Option<Image>>,
    pub skins: Vec<ModelSkin>,
    pub clips: Vec<AnimationClip>,
}

/// Cubic-spline samplers store (in-tangent, value, out-tangent) triples.
fn spline_values<T: Copy>(values: Vec<T>, cubic: bool) -> Vec<T> {
    if cubic {
        values.chunks_exact(3).map(|c| c[1]).collect()
    } else {
        values
    }
}

pub async fn load_model(path: &str) -> Result<ModelAsset, AssetError> {
    let bytes = load_binary(path).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)
        .map_err(|source| AssetError::Gltf { path: path.to_string(), source })?;

    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf.blob.clone().ok_or(AssetError::MissingBuffer {
                path: path.to_string(),
                index: buffer.index(),
            })?,
            gltf::buffer::Source::Uri(uri) => load_binary(&resolve_uri(path, uri)?).await?,
        };
        buffers.push(data);
    }

    let mut images = Vec::new();
    for image in gltf.images() {
        let decoded = match image.source() {
            gltf::image::Source::View { view, .. } => {
                let start = view.offset();
                let bytes = buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.get(start..start + view.length()))
                    .ok_or(AssetError::MissingBuffer {
                        path: path.to_string(),
                        index: view.buffer().index(),
                    });
                bytes.and_then(|b| decode_image(path, b))
            }
            gltf::image::Source::Uri { uri, .. } => match resolve_uri(path, uri) {
                Ok(image_path) => load_texture(&image_path).await,
                Err(err) => Err(err),
            },
        };
        // a broken texture leaves its material untextured instead of dropping the model
        images.push(match decoded {
            Ok(image) => Some(image),
            Err(err) => {
                tracing::warn!(%err, "model texture skipped");
                None
            }
        });
    }

    ModelAsset::from_gltf(path, &gltf, &buffers, images)
}

impl ModelAsset {
    pub fn from_gltf(
        path: &str,
        document: &gltf::Document,
        buffers: &[Vec<u8>],
        images: Vec<Option<Image>>,
    ) -> Result<Self, AssetError> {
        let nodes: Vec<ModelNode> = document
            .nodes()
            .map(|node| {
                let (t, r, s) = node.transform().decomposed();
                ModelNode {
                    name: node.name().unwrap_or("node").to_string(),
                    transform: Transform {
                        translation: Vec3::from(t),
                        rotation: Quat::from_array(r),
                        scale: Vec3::from(s),
                    },
                    mesh: node.mesh().map(|m| m.index()),
                    skin: node.skin().map(|s| s.index()),
                    children: node.children().map(|c| c.index()).collect(),
                }
            })
            .collect();

        let roots = match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => scene.nodes().map(|n| n.index()).collect(),
            None => {
                let mut is_child = vec![false; nodes.len()];
                for node in &nodes {
                    for &c in &node.children {
                        if let Some(flag) = is_child.get_mut(c) {
                            *flag = true;
                        }
                    }
                }
                (0..nodes.len()).filter(|&i| !is_child[i]).collect()
            }
        };

        let buffer_data = |b: gltf::Buffer| buffers.get(b.index()).map(Vec::as_slice);

        let mut meshes = Vec::new();
        for mesh in document.meshes() {
            let mut primitives = Vec::new();
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    continue;
                }
                let reader = primitive.reader(buffer_data);
                let Some(positions) = reader.read_positions() else { continue };
                let positions: Vec<[f32; 3]> = positions.collect();
                let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
                let uvs: Option<Vec<[f32; 2]>> = reader.read_tex_coords(0).map(|t| t.into_f32().collect());
                let joints: Option<Vec<[u16; 4]>> = reader.read_joints(0).map(|j| j.into_u16().collect());
                let weights: Option<Vec<[f32; 4]>> = reader.read_weights(0).map(|w| w.into_f32().collect());
                let indices: Vec<u32> = match reader.read_indices() {
                    Some(indices) => indices.into_u32().collect(),
                    None => (0..positions.len() as u32).collect(),
                };

                let vertices = positions
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let normal = normals.as_ref().and_then(|n| n.get(i)).copied().unwrap_or([0.0, 1.0, 0.0]);
                        let uv = uvs.as_ref().and_then(|t| t.get(i)).copied().unwrap_or([0.0, 0.0]);
                        let mut v = Vertex::new(*p, normal, uv);
                        if let (Some(j), Some(w)) = (
                            joints.as_ref().and_then(|j| j.get(i)),
                            weights.as_ref().and_then(|w| w.get(i)),
                        ) {
                            v.joints = j.map(u32::from);
                            v.weights = *w;
                        }
                        v
                    })
                    .collect();

                let mut mesh = Mesh { vertices, indices };
                if normals.is_none() {
                    mesh.compute_normals();
                }
                primitives.push(ModelPrimitive { mesh, material: primitive.material().index() });
            }
            meshes.push(primitives);
        }

        let materials = document
            .materials()
            .map(|m| {
                let pbr = m.pbr_metallic_roughness();
                ModelMaterial {
                    name: m.name().unwrap_or("material").to_string(),
                    color: pbr.base_color_factor(),
                    texture: pbr.base_color_texture().map(|info| info.texture().source().index()),
                    transparent: m.alpha_mode() == gltf::material::AlphaMode::Blend,
                }
            })
            .collect();

        let skins = document
            .skins()
            .map(|skin| {
                let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
                let inverse_bind = skin
                    .reader(buffer_data)
                    .read_inverse_bind_matrices()
                    .map(|m| m.map(|cols| Mat4::from_cols_array_2d(&cols)).collect())
                    .unwrap_or_else(|| vec![Mat4::IDENTITY; joints.len()]);
                ModelSkin { joints, inverse_bind }
            })
            .collect();

        let mut clips = Vec::new();
        for animation in document.animations() {
            let mut channels = Vec::new();
            for channel in animation.channels() {
                let reader = channel.reader(buffer_data);
                let Some(inputs) = reader.read_inputs() else { continue };
                let Some(outputs) = reader.read_outputs() else { continue };
                let times: Vec<f32> = inputs.collect();
                let sampling = channel.sampler().interpolation();
                let cubic = sampling == gltf::animation::Interpolation::CubicSpline;

                let keyframes = match outputs {
                    ReadOutputs::Translations(t) => Keyframes::Translation(spline_values(t.map(Vec3::from).collect(), cubic)),
                    ReadOutputs::Rotations(r) => {
                        Keyframes::Rotation(spline_values(r.into_f32().map(Quat::from_array).collect(), cubic))
                    }
                    ReadOutputs::Scales(s) => Keyframes::Scale(spline_values(s.map(Vec3::from).collect(), cubic)),
                    ReadOutputs::MorphTargetWeights(_) => continue,
                };
                channels.push(Channel {
                    target: channel.target().node().index(),
                    times,
                    keyframes,
                    interpolation: match sampling {
                        gltf::animation::Interpolation::Step => Interpolation::Step,
                        _ => Interpolation::Linear,
                    },
                });
            }
            clips.push(AnimationClip::new(animation.name().unwrap_or("clip"), channels));
        }

        Ok(Self {
            path: path.to_string(),
            nodes,
            roots,
            meshes,
            materials,
            images,
            skins,
            clips,
        })
    }

    /// Move meshes, materials and images into `resources`; the result can be
    /// instantiated any number of times without re-uploading.
    pub fn register(self, resources: &mut Resources) -> ModelTemplate {
        let ModelAsset { path, nodes, roots, meshes, materials, images, skins, clips } = self;

        let mut textures: Vec<Option<TextureId>> = Vec::with_capacity(images.len());
        for (i, image) in images.into_iter().enumerate() {
            textures.push(image.map(|image| {
                let id = resources.reserve_texture(&format!("{path}#image{i}"), Wrap::Repeat);
                resources.fill_texture(id, image);
                id
            }));
        }

        let mut material_ids = Vec::with_capacity(materials.len());
        for m in &materials {
            let map = m.texture.and_then(|t| textures.get(t).copied().flatten());
            let mut material = Material::lit(&m.name, map);
            material.color = m.color;
            material.transparent = m.transparent;
            material_ids.push(resources.add_material(material));
        }
        let fallback = resources.add_material(Material::lit(&format!("{path}#default"), None));

        let mut primitives = Vec::with_capacity(meshes.len());
        for mesh in meshes {
            let mut ids = Vec::with_capacity(mesh.len());
            for primitive in mesh {
                let material = primitive
                    .material
                    .and_then(|i| material_ids.get(i).copied())
                    .unwrap_or(fallback);
                ids.push((resources.add_mesh(primitive.mesh), material));
            }
            primitives.push(ids);
        }

        ModelTemplate { path, nodes, roots, primitives, skins, clips }
    }
}

/// A registered model, cached per path.
pub struct ModelTemplate {
    pub path: String,
    nodes: Vec<ModelNode>,
    roots: Vec<usize>,
    primitives: Vec<Vec<(MeshId, MaterialId)>>,
    skins: Vec<ModelSkin>,
    clips: Vec<AnimationClip>,
}

pub struct ModelInstance {
    pub root: NodeId,
    /// glTF node index -> scene node, what animation channels target.
    pub bindings: Vec<NodeId>,
}

impl ModelTemplate {
    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    /// Copy the node tree under `parent`. Parents are always added before
    /// their children.
    pub fn instantiate(&self, scene: &mut SceneGraph, parent: NodeId) -> ModelInstance {
        let root = scene.add_group(parent, &self.path, Transform::default());
        let mut bindings = vec![root; self.nodes.len()];
        let mut visited = vec![false; self.nodes.len()];
        let mut skinned: Vec<(NodeId, usize, usize)> = Vec::new();
        let mut stack: Vec<(usize, NodeId)> = self.roots.iter().rev().map(|&r| (r, root)).collect();

        while let Some((index, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else { continue };
            if std::mem::replace(&mut visited[index], true) {
                continue;
            }
            let id = scene.add_group(parent, &node.name, node.transform);
            bindings[index] = id;
            match (node.mesh, node.skin) {
                (Some(mesh), Some(skin)) => skinned.push((id, mesh, skin)),
                (Some(mesh), None) => self.attach_mesh(scene, id, mesh, None),
                _ => {}
            }
            for &child in node.children.iter().rev() {
                stack.push((child, id));
            }
        }

        // joints must all exist before a skin can reference them
        for (id, mesh, skin) in skinned {
            let Some(skin) = self.skins.get(skin) else { continue };
            let joints = skin.joints.iter().map(|&j| bindings.get(j).copied().unwrap_or(root)).collect();
            let skin_id = scene.add_skin(Skin { joints, inverse_bind: skin.inverse_bind.clone() });
            self.attach_mesh(scene, id, mesh, Some(skin_id));
        }

        ModelInstance { root, bindings }
    }

    fn attach_mesh(&self, scene: &mut SceneGraph, node: NodeId, mesh: usize, skin: Option<SkinId>) {
        let Some(primitives) = self.primitives.get(mesh) else { return };
        for &(mesh, material) in primitives {
            let visual = match skin {
                Some(skin) => Visual::Skinned { mesh, material, skin },
                None => Visual::Mesh { mesh, material },
            };
            if primitives.len() == 1 {
                scene.set_visual(node, visual);
            } else {
                scene.add(node, "primitive", Transform::default(), visual);
            }
        }
    }
}

pub enum Loaded {
    Texture { id: TextureId, path: String, result: Result<Image, AssetError> },
    Model { path: String, result: Result<ModelAsset, AssetError> },
    Font { path: String, result: Result<Typeface, AssetError> },
}

/// Completed loads waiting for the next frame.
#[derive(Clone, Default)]
pub struct AssetInbox(Rc<RefCell<VecDeque<Loaded>>>);

impl AssetInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, loaded: Loaded) {
        self.0.borrow_mut().push_back(loaded);
    }

    pub fn drain(&self) -> Vec<Loaded> {
        self.0.borrow_mut().drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// Starts loads; results arrive later through an inbox.
pub trait AssetLoader {
    fn load_texture(&self, path: &str, id: TextureId);
    fn load_model(&self, path: &str);
    fn load_font(&self, path: &str);
}

/// Browser fetch on wasm; blocking file reads natively.
pub struct AsyncLoader {
    inbox: AssetInbox,
}

impl AsyncLoader {
    pub fn new(inbox: AssetInbox) -> Self {
        Self { inbox }
    }
}

fn spawn<F: Future<Output = ()> + 'static>(future: F) {
    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_futures::spawn_local(future);
    #[cfg(not(target_arch = "wasm32"))]
    pollster::block_on(future);
}

impl AssetLoader for AsyncLoader {
    fn load_texture(&self, path: &str, id: TextureId) {
        let inbox = self.inbox.clone();
        let path = path.to_string();
        spawn(async move {
            let result = load_texture(&path).await;
            inbox.push(Loaded::Texture { id, path, result });
        });
    }

    fn load_model(&self, path: &str) {
        let inbox = self.inbox.clone();
        let path = path.to_string();
        spawn(async move {
            let result = load_model(&path).await;
            inbox.push(Loaded::Model { path, result });
        });
    }

    fn load_font(&self, path: &str) {
        let inbox = self.inbox.clone();
        let path = path.to_string();
        spawn(async move {
            let result = load_font(&path).await;
            inbox.push(Loaded::Font { path, result });
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::animation::AnimationMixer;

    /// Binary glTF with one triangle under a root node and a two-key
    /// translation clip on the triangle.
    pub(crate) fn triangle_glb() -> Vec<u8> {
        let mut bin: Vec<u8> = Vec::new();
        for f in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend_from_slice(&f.to_le_bytes());
        }
        for f in [0.0f32, 1.0] {
            bin.extend_from_slice(&f.to_le_bytes());
        }
        for f in [0.0f32, 1.0, 0.0, 2.0, 1.0, 0.0] {
            bin.extend_from_slice(&f.to_le_bytes());
        }
        let json = format!(
            r#"{{"asset":{{"version":"2.0"}},
            "buffers":[{{"byteLength":{len}}}],
            "bufferViews":[
                {{"buffer":0,"byteOffset":0,"byteLength":36}},
                {{"buffer":0,"byteOffset":36,"byteLength":8}},
                {{"buffer":0,"byteOffset":44,"byteLength":24}}],
            "accessors":[
                {{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0,0,0],"max":[1,1,0]}},
                {{"bufferView":1,"componentType":5126,"count":2,"type":"SCALAR","min":[0],"max":[1]}},
                {{"bufferView":2,"componentType":5126,"count":2,"type":"VEC3"}}],
            "meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}}}}]}}],
            "nodes":[{{"name":"root","children":[1]}},{{"name":"tri","mesh":0,"translation":[0,1,0]}}],
            "scenes":[{{"nodes":[0]}}],
            "scene":0,
            "animations":[{{"name":"Survey","channels":[{{"sampler":0,"target":{{"node":1,"path":"translation"}}}}],
                "samplers":[{{"input":1,"output":2}}]}}]}}"#,
            len = bin.len()
        );
        let mut json = json.into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }

    pub(crate) fn triangle_asset(path: &str) -> ModelAsset {
        let glb = triangle_glb();
        let gltf = gltf::Gltf::from_slice(&glb).unwrap();
        let buffers = vec![gltf.blob.clone().unwrap()];
        ModelAsset::from_gltf(path, &gltf, &buffers, Vec::new()).unwrap()
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn web_paths_map_under_the_assets_dir() {
        assert_eq!(
            native_path("/sounds/duck-squeak.wav"),
            std::path::Path::new("./assets/sounds/duck-squeak.wav")
        );
        assert!(matches!(read_binary("/no/such/file.wav"), Err(AssetError::Fetch { .. })));
    }

    #[test]
    fn uris_resolve_next_to_the_gltf() {
        assert_eq!(resolve_uri("/models/Fox/glTF/Fox.gltf", "Fox.bin").unwrap(), "/models/Fox/glTF/Fox.bin");
        assert_eq!(resolve_uri("Duck.gltf", "Duck0.bin").unwrap(), "Duck0.bin");
        assert_eq!(resolve_uri("/m/a.gltf", "my%20tex.png").unwrap(), "/m/my tex.png");
        assert!(matches!(
            resolve_uri("/m/a.gltf", "data:application/octet-stream;base64,AAAA"),
            Err(AssetError::UnsupportedUri { .. })
        ));
    }

    #[test]
    fn images_decode_to_rgba() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(2, 3, image::Rgba([255, 0, 0, 255]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let img = decode_image("/textures/star.png", &png).unwrap();
        assert_eq!((img.width, img.height), (2, 3));
        assert_eq!(&img.rgba[..4], &[255, 0, 0, 255]);

        assert!(matches!(decode_image("/bad.png", b"nope"), Err(AssetError::Image { .. })));
    }

    #[test]
    fn glb_parses_nodes_meshes_and_clips() {
        let asset = triangle_asset("/models/tri.glb");
        assert_eq!(asset.nodes.len(), 2);
        assert_eq!(asset.roots, vec![0]);
        assert_eq!(asset.meshes[0][0].mesh.indices, vec![0, 1, 2]);
        // normals were generated from the face
        assert_eq!(asset.meshes[0][0].mesh.vertices[0].normal, [0.0, 0.0, 1.0]);
        assert_eq!(asset.clips.len(), 1);
        assert_eq!(asset.clips[0].name, "Survey");
        assert_eq!(asset.clips[0].duration, 1.0);
    }

    #[test]
    fn instances_share_meshes_and_drive_animation() {
        let mut resources = Resources::new();
        let template = triangle_asset("/models/tri.glb").register(&mut resources);
        assert_eq!(resources.meshes.len(), 1);

        let mut scene = SceneGraph::new();
        let first = template.instantiate(&mut scene, SceneGraph::ROOT);
        let second = template.instantiate(&mut scene, SceneGraph::ROOT);
        assert_eq!(resources.meshes.len(), 1);
        assert_ne!(first.bindings[1], second.bindings[1]);

        let tri = first.bindings[1];
        assert!(matches!(scene.node(tri).visual, Visual::Mesh { .. }));
        assert_eq!(scene.node(tri).parent, Some(first.bindings[0]));
        assert_eq!(scene.transform(tri).translation, Vec3::new(0.0, 1.0, 0.0));

        let mut mixer = AnimationMixer::new(template.clips().to_vec(), first.bindings.clone());
        let idle = mixer.clip_action(0);
        mixer.play(idle);
        mixer.update(0.5, &mut scene);
        assert_eq!(scene.transform(tri).translation, Vec3::new(1.0, 1.0, 0.0));
        // the second copy is not bound to this mixer
        assert_eq!(scene.transform(second.bindings[1]).translation, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn inbox_drains_in_arrival_order() {
        let inbox = AssetInbox::new();
        let writer = inbox.clone();
        writer.push(Loaded::Model {
            path: "/a".into(),
            result: Err(AssetError::Fetch { path: "/a".into(), reason: "404".into() }),
        });
        writer.push(Loaded::Model { path: "/b".into(), result: Ok(triangle_asset("/b")) });
        let drained = inbox.drain();
        let paths: Vec<_> = drained
            .iter()
            .map(|l| match l {
                Loaded::Model { path, .. } | Loaded::Texture { path, .. } | Loaded::Font { path, .. } => {
                    path.as_str()
                }
            })
            .collect();
        assert_eq!(paths, vec!["/a", "/b"]);
        assert!(inbox.is_empty());
    }
}
