use crate::utils::Mesh;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    Clamp,
    Repeat,
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone)]
pub struct Image {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// A texture handle that exists before its pixels arrive. The renderer
/// samples white until `image` is set and re-uploads when `revision` moves.
#[derive(Debug, Clone)]
pub struct TextureSlot {
    pub source: String,
    pub wrap: Wrap,
    pub image: Option<Image>,
    pub revision: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shading {
    /// Lambert with scene lights and fog.
    Lit,
    /// Flat colour, still fogged.
    Unlit,
    /// Colour looked up from `map` by the view-space normal; no lights.
    Matcap,
}

impl Shading {
    /// Selector the scene shader branches on.
    pub fn code(self) -> f32 {
        match self {
            Shading::Lit => 0.0,
            Shading::Unlit => 1.0,
            Shading::Matcap => 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub color: [f32; 4],
    pub map: Option<TextureId>,
    pub alpha_map: Option<TextureId>,
    pub uv_repeat: [f32; 2],
    pub transparent: bool,
    /// Fragments with alpha below this are discarded.
    pub alpha_test: f32,
    pub shading: Shading,
}

impl Material {
    pub fn lit(name: &str, map: Option<TextureId>) -> Self {
        Self {
            name: name.to_string(),
            color: [1.0, 1.0, 1.0, 1.0],
            map,
            alpha_map: None,
            uv_repeat: [1.0, 1.0],
            transparent: false,
            alpha_test: 0.0,
            shading: Shading::Lit,
        }
    }

    pub fn basic(name: &str, rgb: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            color: [rgb[0], rgb[1], rgb[2], 1.0],
            map: None,
            alpha_map: None,
            uv_repeat: [1.0, 1.0],
            transparent: false,
            alpha_test: 0.0,
            shading: Shading::Unlit,
        }
    }
}

impl Material {
    pub fn matcap(name: &str, matcap: TextureId) -> Self {
        Self {
            shading: Shading::Matcap,
            ..Self::lit(name, Some(matcap))
        }
    }
}

/// CPU-side meshes, materials and textures referenced by scene nodes.
#[derive(Default)]
pub struct Resources {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
    pub textures: Vec<TextureSlot>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Reserve a texture whose pixels will be delivered later.
    pub fn reserve_texture(&mut self, source: &str, wrap: Wrap) -> TextureId {
        self.textures.push(TextureSlot {
            source: source.to_string(),
            wrap,
            image: None,
            revision: 0,
        });
        TextureId(self.textures.len() - 1)
    }

    pub fn fill_texture(&mut self, id: TextureId, image: Image) {
        if let Some(slot) = self.textures.get_mut(id.0) {
            slot.image = Some(image);
            slot.revision += 1;
        }
    }

    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id.0]
    }

    pub fn mesh(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0]
    }
}
