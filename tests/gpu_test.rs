use zone_ngin::{
    error::GpuError,
    gpu::{
        BufferTarget, DataType, DrawMode, ShaderStage, UniformValue, buffer::GlBuffer,
        shader::Shader,
    },
    pipelines::basic::mk_basic_shader,
    render::DrawRange,
};

mod common;
use common::test_utils::headless;

const VERTEX: &str = "
@group(0) @binding(0)
var<uniform> u_a: mat4x4<f32>;

@vertex
fn vs_main(@location(0) a_position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return u_a * vec4<f32>(a_position, 1.0);
}
";

const FRAGMENT_CONFLICTING: &str = "
@group(0) @binding(0)
var<uniform> u_b: vec4<f32>;

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return u_b;
}
";

#[test]
fn should_compose_the_stride_from_registered_attributes() {
    let (_, gpu) = headless();
    let mut buffer = GlBuffer::vertices(&gpu, 5);
    assert_eq!(buffer.stride(), 20);

    buffer.add_attribute_location(0, 3).unwrap();
    buffer.add_attribute_location(1, 2).unwrap();

    assert!(buffer.has_attribute_location());
    assert_eq!(buffer.stride(), 20);
    let offsets: Vec<u32> = buffer.attributes().iter().map(|a| a.offset).collect();
    assert_eq!(offsets, vec![0, 3]);
}

#[test]
fn should_lock_the_layout_after_upload() {
    let (device, gpu) = headless();
    let mut buffer = GlBuffer::vertices(&gpu, 2);
    buffer.add_attribute_location(0, 2).unwrap();
    buffer.push_back_data(&[1.0, 2.0]);
    buffer.upload().unwrap();

    assert_eq!(buffer.add_attribute_location(1, 2), Err(GpuError::LayoutLocked));

    let expected: Vec<u8> = [1.0f32, 2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
    assert_eq!(device.buffer_contents(buffer.handle()), Some(expected));
}

#[test]
fn should_only_set_attribute_pointers_for_configured_buffers() {
    let (device, gpu) = headless();
    let shader = mk_basic_shader(&gpu).unwrap();
    shader.use_program();

    let mut plain = GlBuffer::vertices(&gpu, 3);
    plain.push_back_data(&[0.0; 9]);
    plain.upload().unwrap();
    plain.bind(false);
    plain.draw().unwrap();

    let frame = device.frame();
    let draw = &frame.draws[0];
    assert!(draw.attributes.is_empty());
    assert_eq!(draw.range, DrawRange::Arrays { first: 0, count: 3 });

    let mut configured = GlBuffer::vertices(&gpu, 5);
    configured.add_attribute_location(0, 3).unwrap();
    configured.add_attribute_location(1, 2).unwrap();
    configured.push_back_data(&[0.0; 30]);
    configured.upload().unwrap();
    configured.bind(false);
    configured.draw().unwrap();

    let frame = device.frame();
    let draw = &frame.draws[1];
    let layout: Vec<(u32, u32, u32, u32)> = draw
        .attributes
        .iter()
        .map(|a| (a.location, a.size, a.stride, a.offset))
        .collect();
    assert_eq!(layout, vec![(0, 3, 20, 0), (1, 2, 20, 12)]);
    assert_eq!(draw.range, DrawRange::Arrays { first: 0, count: 6 });
}

#[test]
fn should_draw_index_buffers_as_elements() {
    let (device, gpu) = headless();
    let shader = mk_basic_shader(&gpu).unwrap();
    shader.use_program();

    let mut vertices = GlBuffer::vertices(&gpu, 3);
    vertices.add_attribute_location(0, 3).unwrap();
    vertices.push_back_data(&[0.0; 12]);
    vertices.upload().unwrap();
    vertices.bind(false);

    let mut indices = GlBuffer::new(
        &gpu,
        1,
        DataType::UnsignedShort,
        BufferTarget::ElementArray,
        DrawMode::Triangles,
    );
    indices.push_back_data(&[0.0, 1.0, 2.0, 2.0, 3.0, 0.0]);
    indices.upload().unwrap();
    indices.draw().unwrap();

    let frame = device.frame();
    let draw = &frame.draws[0];
    assert_eq!(draw.index_buffer, Some(indices.handle()));
    assert_eq!(
        draw.range,
        DrawRange::Elements {
            count: 6,
            index_type: DataType::UnsignedShort,
            offset: 0
        }
    );
    assert_eq!(device.buffer_contents(indices.handle()).unwrap().len(), 12);
}

#[test]
fn should_refuse_to_draw_without_a_program() {
    let (_, gpu) = headless();
    let mut buffer = GlBuffer::vertices(&gpu, 3);
    buffer.push_back_data(&[0.0; 9]);
    buffer.upload().unwrap();
    buffer.bind(false);
    assert_eq!(buffer.draw(), Err(GpuError::NoProgram));
}

#[test]
fn should_free_buffers_on_destroy() {
    let (device, gpu) = headless();
    let buffer = GlBuffer::vertices(&gpu, 3);
    assert_eq!(device.live_buffers(), 1);
    buffer.destroy();
    assert_eq!(device.live_buffers(), 0);
}

#[test]
fn should_discover_attribute_and_uniform_locations() {
    let (_, gpu) = headless();
    let shader = mk_basic_shader(&gpu).unwrap();

    assert_eq!(shader.attribute_location("a_position"), Ok(0));
    assert_eq!(shader.attribute_location("a_tex_coord"), Ok(1));
    for name in ["u_projection", "u_model", "u_tint", "u_diffuse"] {
        assert!(shader.uniform_location(name).is_ok(), "{name} missing");
    }
}

#[test]
fn should_fail_fast_on_unknown_names() {
    let (_, gpu) = headless();
    let shader = mk_basic_shader(&gpu).unwrap();

    assert_eq!(
        shader.uniform_location("u_missing"),
        Err(GpuError::MissingUniform {
            shader: "basic".to_string(),
            name: "u_missing".to_string()
        })
    );
    assert!(matches!(
        shader.attribute_location("a_missing"),
        Err(GpuError::MissingAttribute { .. })
    ));
    assert!(shader.set_uniform("u_missing", UniformValue::Int(1)).is_err());
}

#[test]
fn should_reject_shaders_that_do_not_compile() {
    let (device, gpu) = headless();
    let result = Shader::load(&gpu, "broken", "this is not wgsl", FRAGMENT_CONFLICTING);

    match result {
        Err(GpuError::Compile { shader, stage, log }) => {
            assert_eq!(shader, "broken");
            assert_eq!(stage, ShaderStage::Vertex);
            assert!(!log.is_empty());
        }
        Err(other) => panic!("unexpected error {other}"),
        Ok(_) => panic!("a broken shader compiled"),
    }
    assert_eq!(device.live_programs(), 0);
}

#[test]
fn should_reject_programs_that_do_not_link() {
    let (device, gpu) = headless();
    let result = Shader::load(&gpu, "conflict", VERTEX, FRAGMENT_CONFLICTING);

    assert!(matches!(result, Err(GpuError::Link { .. })));
    assert_eq!(device.live_programs(), 0);
}

#[test]
fn should_delete_the_program_with_the_shader() {
    let (device, gpu) = headless();
    let shader = mk_basic_shader(&gpu).unwrap();
    assert_eq!(device.live_programs(), 1);
    drop(shader);
    assert_eq!(device.live_programs(), 0);
}
