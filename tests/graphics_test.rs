use cgmath::Matrix4;
use zone_ngin::{
    error::ConfigError,
    gpu::{SamplerParams, TextureFilter, TextureWrap, UniformValue},
    graphics::{Color, Material, Sprite},
    pipelines::basic::mk_basic_shader,
    resources::{ImageResource, ResourceData},
};

mod common;
use common::test_utils::{Harness, MemoryLoader};

fn image(width: u32, height: u32) -> ResourceData {
    ResourceData::Image(ImageResource {
        width,
        height,
        data: vec![7; (width * height * 4) as usize],
    })
}

fn harness_with_images() -> Harness {
    let harness = Harness::new();
    let loader = MemoryLoader::new(&["png"])
        .with_file("square.png", image(4, 4))
        .with_file("wide.png", image(3, 2));
    harness.ctx.resources.register_loader(loader);
    harness
}

#[test]
fn should_parse_hex_colours() {
    assert_eq!(Color::from_hex("#FF8000").unwrap(), Color::new(255, 128, 0, 255));
    assert_eq!(Color::from_hex("1d2b5380").unwrap(), Color::new(0x1D, 0x2B, 0x53, 0x80));
    assert_eq!(
        Color::from_hex("#12345"),
        Err(ConfigError::InvalidColor("#12345".to_string()))
    );
    assert!(Color::from_hex("#GG0000").is_err());
    assert_eq!(Color::WHITE.to_float_array(), [1.0, 1.0, 1.0, 1.0]);

    let parsed: Color = serde_json::from_str("\"#000000FF\"").unwrap();
    assert_eq!(parsed, Color::BLACK);
    assert_eq!(serde_json::to_string(&Color::RED).unwrap(), "\"#FF0000FF\"");
}

#[test]
fn should_share_textures_by_name_until_the_last_release() {
    let harness = harness_with_images();
    let textures = &harness.ctx.textures;

    let first = textures.get_texture("square.png");
    let second = textures.get_texture("square.png");
    assert_eq!(first.handle(), second.handle());
    assert_eq!(textures.reference_count("square.png"), 2);
    assert_eq!(harness.device.live_textures(), 1);

    textures.release_texture("square.png");
    assert_eq!(harness.device.live_textures(), 1);
    textures.release_texture("square.png");
    assert_eq!(textures.reference_count("square.png"), 0);
    assert_eq!(harness.device.live_textures(), 0);

    // releasing again only warns
    textures.release_texture("square.png");
}

#[test]
fn should_replace_the_placeholder_once_the_image_loads() {
    let harness = harness_with_images();
    let textures = &harness.ctx.textures;

    let square = textures.get_texture("square.png");
    let wide = textures.get_texture("wide.png");
    assert!(!square.is_loaded());
    let placeholder = harness.device.texture(square.handle()).unwrap();
    assert_eq!((placeholder.width, placeholder.height), (1, 1));

    harness.pump();

    assert!(square.is_loaded());
    let uploaded = harness.device.texture(square.handle()).unwrap();
    assert_eq!((uploaded.width, uploaded.height), (4, 4));
    assert_eq!(uploaded.params, SamplerParams::default());

    let uploaded = harness.device.texture(wide.handle()).unwrap();
    assert_eq!((wide.width(), wide.height()), (3, 2));
    assert_eq!(
        uploaded.params,
        SamplerParams {
            wrap: TextureWrap::ClampToEdge,
            min_filter: TextureFilter::Nearest
        }
    );
}

#[test]
fn should_use_cached_images_right_away() {
    let harness = harness_with_images();
    harness.ctx.resources.load_resource("square.png");
    harness.pump();

    let texture = harness.ctx.textures.get_texture("square.png");
    assert!(texture.is_loaded());
    assert_eq!(texture.width(), 4);
}

#[test]
fn should_release_material_textures_with_the_material() {
    let harness = harness_with_images();
    let materials = &harness.ctx.materials;
    let textures = &harness.ctx.textures;

    materials.register_material(Material::new("crate", Some("square.png"), Color::RED, textures));
    assert_eq!(materials.reference_count("crate"), 1);
    assert_eq!(textures.reference_count("square.png"), 1);

    let material = materials.get_material("crate").unwrap();
    assert_eq!(material.tint(), Color::RED);
    assert_eq!(materials.reference_count("crate"), 2);

    materials.release_material("crate");
    materials.release_material("crate");
    assert_eq!(materials.reference_count("crate"), 0);
    assert_eq!(textures.reference_count("square.png"), 0);
    assert_eq!(harness.device.live_textures(), 0);

    assert!(materials.get_material("crate").is_none());
    // unregistered names only warn
    materials.release_material("crate");
}

#[test]
fn should_draw_sprites_with_tint_and_texture() {
    let harness = harness_with_images();
    let shader = mk_basic_shader(&harness.gpu()).unwrap();
    let materials = &harness.ctx.materials;
    materials.register_material(Material::new(
        "tinted",
        Some("square.png"),
        Color::GREEN,
        &harness.ctx.textures,
    ));

    let mut sprite = Sprite::new(&harness.gpu(), materials, "hero", "tinted", 32.0, 16.0, 0, 1);
    sprite.load().unwrap();
    assert_eq!(materials.reference_count("tinted"), 2);
    let vertices = harness
        .device
        .buffer_contents(sprite.buffer().unwrap().handle())
        .unwrap();
    assert_eq!(vertices.len(), 6 * 5 * 4);

    shader.use_program();
    sprite.draw(&shader, &Matrix4::from_scale(1.0)).unwrap();

    let frame = harness.device.frame();
    let draw = &frame.draws[0];
    let tint = shader.uniform_location("u_tint").unwrap();
    let diffuse = shader.uniform_location("u_diffuse").unwrap();
    assert_eq!(
        draw.uniform(tint),
        Some(&UniformValue::Vec4(Color::GREEN.to_float_array()))
    );
    assert_eq!(draw.uniform(diffuse), Some(&UniformValue::Int(0)));
    let texture = sprite.material().unwrap().diffuse_texture().unwrap().handle();
    assert_eq!(draw.textures.get(&0), Some(&texture));

    sprite.destroy();
    assert_eq!(materials.reference_count("tinted"), 1);
    assert_eq!(harness.device.live_buffers(), 0);
}

#[test]
fn should_ignore_a_queued_image_once_the_texture_is_released() {
    let harness = harness_with_images();
    let textures = &harness.ctx.textures;

    let texture = textures.get_texture("square.png");
    harness.ctx.resources.poll().unwrap();
    assert_eq!(harness.ctx.bus.pending(), 1);

    textures.release_texture("square.png");
    assert!(texture.is_destroyed());
    harness.ctx.bus.update().unwrap();

    assert!(!texture.is_loaded());
    assert_eq!((texture.width(), texture.height()), (1, 1));
    assert_eq!(harness.device.live_textures(), 0);
}

#[test]
fn should_draw_sprites_without_a_material_untinted() {
    let harness = harness_with_images();
    let shader = mk_basic_shader(&harness.gpu()).unwrap();
    let materials = &harness.ctx.materials;
    materials.register_material(Material::new("red", None, Color::RED, &harness.ctx.textures));

    let mut red = Sprite::new(&harness.gpu(), materials, "red", "red", 8.0, 8.0, 0, 1);
    let mut orphan = Sprite::new(&harness.gpu(), materials, "orphan", "missing", 8.0, 8.0, 0, 1);
    red.load().unwrap();
    orphan.load().unwrap();
    assert!(orphan.material().is_none());

    shader.use_program();
    red.draw(&shader, &Matrix4::from_scale(1.0)).unwrap();
    orphan.draw(&shader, &Matrix4::from_scale(1.0)).unwrap();

    let frame = harness.device.frame();
    let tint = shader.uniform_location("u_tint").unwrap();
    assert_eq!(
        frame.draws[0].uniform(tint),
        Some(&UniformValue::Vec4(Color::RED.to_float_array()))
    );
    assert_eq!(
        frame.draws[1].uniform(tint),
        Some(&UniformValue::Vec4(Color::WHITE.to_float_array()))
    );
}
