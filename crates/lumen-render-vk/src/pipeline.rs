// SPDX-License-Identifier: CEPL-1.0
//! Shader loading, layouts and the scene pipeline.
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use ash::util::read_spv;
use ash::vk;
use bytemuck::{Pod, Zeroable};
use lumen_render::{InstanceData, RenderError, RenderResult};

use crate::geometry::VERTEX_STRIDE;
use crate::handles::Owned;

pub const VERTEX_SHADER_FILE: &str = "scene.vert.spv";
pub const FRAGMENT_SHADER_FILE: &str = "scene.frag.spv";

/// Parents of the executable directory searched for `shaders/`.
const EXE_PARENT_DEPTH: usize = 3;

/// Set 0, binding 0.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct SceneViewUniform {
    pub view_projection: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct PushConstants {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl From<&InstanceData> for PushConstants {
    fn from(i: &InstanceData) -> Self {
        Self {
            model: i.model.to_cols_array_2d(),
            color: i.color.to_array(),
        }
    }
}

pub(crate) fn push_stages() -> vk::ShaderStageFlags {
    vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
}

/// Directories tried for precompiled shaders, in order.
pub fn shader_search_paths(shader_dir: Option<&Path>, exe: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = shader_dir {
        paths.push(dir.to_path_buf());
    }
    paths.push(PathBuf::from("shaders"));
    if let Some(exe_dir) = exe.and_then(Path::parent) {
        paths.extend(
            exe_dir
                .ancestors()
                .take(EXE_PARENT_DEPTH + 1)
                .map(|d| d.join("shaders")),
        );
    }
    paths
}

pub fn locate_shader(file: &str, dirs: &[PathBuf]) -> RenderResult<PathBuf> {
    dirs.iter()
        .map(|d| d.join(file))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            let tried: Vec<String> = dirs.iter().map(|d| d.join(file).display().to_string()).collect();
            RenderError::Shader {
                path: PathBuf::from(file),
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("not found, tried: {}", tried.join(", ")),
                ),
            }
        })
}

pub fn decode_spirv(name: &str, bytes: &[u8]) -> RenderResult<Vec<u32>> {
    read_spv(&mut Cursor::new(bytes)).map_err(|e| RenderError::InvalidShader(format!("{name}: {e}")))
}

/// SPIR-V words for both stages.
pub(crate) struct ShaderBinaries {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
}

impl ShaderBinaries {
    #[cfg(feature = "embed-shaders")]
    pub fn load(_shader_dir: Option<&Path>) -> RenderResult<Self> {
        let vs = include_bytes!(concat!(env!("OUT_DIR"), "/scene.vert.spv"));
        let fs = include_bytes!(concat!(env!("OUT_DIR"), "/scene.frag.spv"));
        Ok(Self {
            vertex: decode_spirv(VERTEX_SHADER_FILE, vs)?,
            fragment: decode_spirv(FRAGMENT_SHADER_FILE, fs)?,
        })
    }

    #[cfg(not(feature = "embed-shaders"))]
    pub fn load(shader_dir: Option<&Path>) -> RenderResult<Self> {
        let exe = std::env::current_exe().ok();
        let dirs = shader_search_paths(shader_dir, exe.as_deref());
        Ok(Self {
            vertex: read_shader(VERTEX_SHADER_FILE, &dirs)?,
            fragment: read_shader(FRAGMENT_SHADER_FILE, &dirs)?,
        })
    }
}

#[cfg(not(feature = "embed-shaders"))]
fn read_shader(file: &str, dirs: &[PathBuf]) -> RenderResult<Vec<u32>> {
    let path = locate_shader(file, dirs)?;
    tracing::debug!("loading shader {}", path.display());
    let bytes = std::fs::read(&path).map_err(|source| RenderError::Shader {
        path: path.clone(),
        source,
    })?;
    decode_spirv(file, &bytes)
}

pub(crate) struct ShaderModules {
    pub vertex: Owned<vk::ShaderModule>,
    pub fragment: Owned<vk::ShaderModule>,
}

impl ShaderModules {
    pub unsafe fn new(device: &ash::Device, code: &ShaderBinaries) -> RenderResult<Self> {
        Ok(Self {
            vertex: create_shader_module(device, &code.vertex)?,
            fragment: create_shader_module(device, &code.fragment)?,
        })
    }
}

unsafe fn create_shader_module(device: &ash::Device, words: &[u32]) -> RenderResult<Owned<vk::ShaderModule>> {
    let ci = vk::ShaderModuleCreateInfo {
        s_type: vk::StructureType::SHADER_MODULE_CREATE_INFO,
        p_code: words.as_ptr(),
        code_size: words.len() * 4,
        ..Default::default()
    };
    let module = device
        .create_shader_module(&ci, None)
        .map_err(|e| RenderError::api("vkCreateShaderModule", e))?;
    Ok(Owned::new(device, module))
}

/// Descriptor-set layout and pipeline layout. Independent of the swapchain.
pub(crate) struct PipelineLayouts {
    layout: Owned<vk::PipelineLayout>,
    set_layout: Owned<vk::DescriptorSetLayout>,
}

impl PipelineLayouts {
    pub unsafe fn new(device: &ash::Device) -> RenderResult<Self> {
        let binding = vk::DescriptorSetLayoutBinding {
            binding: 0,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: 1,
            stage_flags: vk::ShaderStageFlags::VERTEX,
            ..Default::default()
        };
        let set_ci = vk::DescriptorSetLayoutCreateInfo {
            s_type: vk::StructureType::DESCRIPTOR_SET_LAYOUT_CREATE_INFO,
            binding_count: 1,
            p_bindings: &binding,
            ..Default::default()
        };
        let set_layout = Owned::new(
            device,
            device
                .create_descriptor_set_layout(&set_ci, None)
                .map_err(|e| RenderError::api("vkCreateDescriptorSetLayout", e))?,
        );

        let push_range = vk::PushConstantRange {
            stage_flags: push_stages(),
            offset: 0,
            size: std::mem::size_of::<PushConstants>() as u32,
        };
        let raw_set_layout = set_layout.raw();
        let layout_ci = vk::PipelineLayoutCreateInfo {
            s_type: vk::StructureType::PIPELINE_LAYOUT_CREATE_INFO,
            set_layout_count: 1,
            p_set_layouts: &raw_set_layout,
            push_constant_range_count: 1,
            p_push_constant_ranges: &push_range,
            ..Default::default()
        };
        let layout = Owned::new(
            device,
            device
                .create_pipeline_layout(&layout_ci, None)
                .map_err(|e| RenderError::api("vkCreatePipelineLayout", e))?,
        );

        Ok(Self { layout, set_layout })
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout.raw()
    }

    pub fn set_layout(&self) -> vk::DescriptorSetLayout {
        self.set_layout.raw()
    }
}

/// STRICT: the render pass must be the one the framebuffers were built against.
pub(crate) unsafe fn create_pipeline(
    device: &ash::Device,
    layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
    shaders: &ShaderModules,
) -> RenderResult<Owned<vk::Pipeline>> {
    let entry = c"main";
    let stages = [
        vk::PipelineShaderStageCreateInfo {
            s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
            stage: vk::ShaderStageFlags::VERTEX,
            module: shaders.vertex.raw(),
            p_name: entry.as_ptr(),
            ..Default::default()
        },
        vk::PipelineShaderStageCreateInfo {
            s_type: vk::StructureType::PIPELINE_SHADER_STAGE_CREATE_INFO,
            stage: vk::ShaderStageFlags::FRAGMENT,
            module: shaders.fragment.raw(),
            p_name: entry.as_ptr(),
            ..Default::default()
        },
    ];

    let vb = vk::VertexInputBindingDescription {
        binding: 0,
        stride: VERTEX_STRIDE,
        input_rate: vk::VertexInputRate::VERTEX,
    };
    let va = vk::VertexInputAttributeDescription {
        location: 0,
        binding: 0,
        format: vk::Format::R32G32B32_SFLOAT,
        offset: 0,
    };
    let vertex_input = vk::PipelineVertexInputStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_VERTEX_INPUT_STATE_CREATE_INFO,
        vertex_binding_description_count: 1,
        p_vertex_binding_descriptions: &vb,
        vertex_attribute_description_count: 1,
        p_vertex_attribute_descriptions: &va,
        ..Default::default()
    };
    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_INPUT_ASSEMBLY_STATE_CREATE_INFO,
        topology: vk::PrimitiveTopology::TRIANGLE_LIST,
        ..Default::default()
    };
    let dyn_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_DYNAMIC_STATE_CREATE_INFO,
        dynamic_state_count: dyn_states.len() as u32,
        p_dynamic_states: dyn_states.as_ptr(),
        ..Default::default()
    };
    let viewport_state = vk::PipelineViewportStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_VIEWPORT_STATE_CREATE_INFO,
        viewport_count: 1,
        scissor_count: 1,
        ..Default::default()
    };
    let raster = vk::PipelineRasterizationStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_RASTERIZATION_STATE_CREATE_INFO,
        polygon_mode: vk::PolygonMode::FILL,
        cull_mode: vk::CullModeFlags::BACK,
        front_face: vk::FrontFace::COUNTER_CLOCKWISE,
        line_width: 1.0,
        ..Default::default()
    };
    let multisample = vk::PipelineMultisampleStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_MULTISAMPLE_STATE_CREATE_INFO,
        rasterization_samples: vk::SampleCountFlags::TYPE_1,
        ..Default::default()
    };
    let color_blend_att = vk::PipelineColorBlendAttachmentState {
        color_write_mask: vk::ColorComponentFlags::R
            | vk::ColorComponentFlags::G
            | vk::ColorComponentFlags::B
            | vk::ColorComponentFlags::A,
        blend_enable: vk::FALSE,
        ..Default::default()
    };
    let color_blend = vk::PipelineColorBlendStateCreateInfo {
        s_type: vk::StructureType::PIPELINE_COLOR_BLEND_STATE_CREATE_INFO,
        attachment_count: 1,
        p_attachments: &color_blend_att,
        ..Default::default()
    };

    let pipeline_info = vk::GraphicsPipelineCreateInfo {
        s_type: vk::StructureType::GRAPHICS_PIPELINE_CREATE_INFO,
        stage_count: stages.len() as u32,
        p_stages: stages.as_ptr(),
        p_vertex_input_state: &vertex_input,
        p_input_assembly_state: &input_assembly,
        p_viewport_state: &viewport_state,
        p_rasterization_state: &raster,
        p_multisample_state: &multisample,
        p_color_blend_state: &color_blend,
        p_dynamic_state: &dynamic_state,
        layout,
        render_pass,
        subpass: 0,
        ..Default::default()
    };

    let pipelines = device
        .create_graphics_pipelines(
            vk::PipelineCache::null(),
            std::slice::from_ref(&pipeline_info),
            None,
        )
        .map_err(|(_, err)| RenderError::api("vkCreateGraphicsPipelines", err))?;
    Ok(Owned::new(device, pipelines[0]))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use lumen_render::glam::{Mat4, Vec3, Vec4};

    use super::*;

    #[test]
    fn push_constants_fit_the_guaranteed_limit() {
        assert_eq!(std::mem::size_of::<PushConstants>(), 80);
        assert!(std::mem::size_of::<PushConstants>() <= 128);
        assert_eq!(std::mem::size_of::<SceneViewUniform>(), 64);
    }

    #[test]
    fn push_constants_copy_the_instance() {
        let inst = InstanceData {
            model: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            color: Vec4::new(0.1, 0.2, 0.3, 1.0),
            sleeping: false,
        };
        let pc = PushConstants::from(&inst);
        assert_eq!(pc.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(pc.color, [0.1, 0.2, 0.3, 1.0]);
    }

    #[test]
    fn search_order_is_config_cwd_then_exe_ancestors() {
        let exe = Path::new("/opt/lumen/bin/release/lumen");
        let paths = shader_search_paths(Some(Path::new("/etc/lumen/spv")), Some(exe));
        let expected: Vec<PathBuf> = [
            "/etc/lumen/spv",
            "shaders",
            "/opt/lumen/bin/release/shaders",
            "/opt/lumen/bin/shaders",
            "/opt/lumen/shaders",
            "/opt/shaders",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn missing_shader_lists_every_path_tried() {
        let dirs = vec![PathBuf::from("/nonexistent/a"), PathBuf::from("/nonexistent/b")];
        let err = locate_shader(VERTEX_SHADER_FILE, &dirs).unwrap_err();
        let RenderError::Shader { source, .. } = &err else {
            panic!("unexpected error {err:?}");
        };
        let msg = source.to_string();
        assert!(msg.contains("/nonexistent/a/scene.vert.spv"));
        assert!(msg.contains("/nonexistent/b/scene.vert.spv"));
    }

    #[test]
    fn first_matching_directory_wins() {
        let root = std::env::temp_dir().join(format!("lumen-shader-search-{}", std::process::id()));
        let (a, b) = (root.join("a"), root.join("b"));
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();
        fs::write(b.join(FRAGMENT_SHADER_FILE), [0u8; 4]).unwrap();

        let found = locate_shader(FRAGMENT_SHADER_FILE, &[a.clone(), b.clone()]).unwrap();
        assert_eq!(found, b.join(FRAGMENT_SHADER_FILE));
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn spirv_needs_magic_and_word_alignment() {
        let mut good = 0x0723_0203u32.to_le_bytes().to_vec();
        good.extend_from_slice(&[0, 0, 1, 0]);
        assert_eq!(decode_spirv("ok", &good).unwrap().len(), 2);

        assert!(matches!(decode_spirv("odd", &good[..6]), Err(RenderError::InvalidShader(_))));
        assert!(matches!(decode_spirv("bad", &[1, 2, 3, 4]), Err(RenderError::InvalidShader(_))));
    }

    #[cfg(feature = "embed-shaders")]
    #[test]
    fn default_build_embeds_both_stages() {
        let bins = ShaderBinaries::load(Some(Path::new("does/not/exist"))).unwrap();
        assert_eq!(bins.vertex.first(), Some(&0x0723_0203));
        assert_eq!(bins.fragment.first(), Some(&0x0723_0203));
    }
}
