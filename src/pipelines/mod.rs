//! Render pipeline construction for the wgpu backend, plus the built-in shaders.

pub mod basic;

/// Builds a pipeline for one program/vertex-layout/topology combination.
///
/// With `layout: None` wgpu derives the bind group layouts from the shaders, which
/// is what lets the GL-style uniform slots of any linked program be bound by number.
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: Option<&wgpu::PipelineLayout>,
    stages: [(&wgpu::ShaderModule, &str); 2],
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    topology: wgpu::PrimitiveTopology,
    strip_index_format: Option<wgpu::IndexFormat>,
) -> wgpu::RenderPipeline {
    let [(vertex, vs_entry), (fragment, fs_entry)] = stages;

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some("Render Pipeline"),
        layout,
        vertex: wgpu::VertexState {
            module: vertex,
            entry_point: Some(vs_entry),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: fragment,
            entry_point: Some(fs_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            // The screen-space projection flips y, so winding isn't meaningful for sprites.
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
    })
}
