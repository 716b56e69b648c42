//! The per-frame driver.
//!
//! [`Engine`] wires a [`Context`] together with the basic shader and runs one
//! frame at a time:
//!
//! 1. apply finished resource loads
//! 2. drain the message bus, at most `message_limit` units
//! 3. update the active zone
//! 4. clear and draw the active zone with the orthographic projection
//!
//! Windowing and presentation stay with the caller, which owns the
//! [`GraphicsDevice`](crate::gpu::GraphicsDevice) and decides when to call
//! [`Engine::frame`].

use std::rc::Rc;

use cgmath::Matrix4;
use instant::Instant;

use crate::{
    components::{RotationBehaviorBuilder, SpriteComponentBuilder},
    config::EngineConfig,
    context::Context,
    gpu::{Gpu, shader::Shader},
    graphics::Color,
    pipelines::basic::mk_basic_shader,
    resources::{ImageResourceLoader, JsonResourceLoader, Spawner},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&JsValue::from_str(&e.to_string()));
        }
    }
}

pub struct Engine {
    ctx: Context,
    shader: Shader,
    projection: Matrix4<f32>,
    clear_color: Color,
    last_time: Instant,
}

impl Engine {
    pub fn new(gpu: Gpu, spawner: Spawner, config: &EngineConfig) -> anyhow::Result<Self> {
        init_logging();
        let ctx = Context::new(gpu, spawner, config);

        ctx.resources.register_loader(Rc::new(ImageResourceLoader));
        ctx.resources.register_loader(Rc::new(JsonResourceLoader));

        let shader = mk_basic_shader(&ctx.gpu)?;
        let position_location = shader.attribute_location("a_position")?;
        let tex_coord_location = shader.attribute_location("a_tex_coord")?;
        ctx.components.register_builder(Rc::new(SpriteComponentBuilder::new(
            ctx.gpu.clone(),
            ctx.materials.clone(),
            position_location,
            tex_coord_location,
        )));
        ctx.behaviors.register_builder(Rc::new(RotationBehaviorBuilder));

        for material in config.materials.iter() {
            ctx.materials.register_config(material);
        }
        for zone in config.zones.iter() {
            ctx.zones.register_zone(zone.id, &zone.path);
        }

        let mut engine = Self {
            ctx,
            shader,
            projection: Matrix4::from_scale(1.0),
            clear_color: config.clear_color,
            last_time: Instant::now(),
        };
        engine.resize(config.width, config.height);

        if let Some(id) = config.start_zone {
            engine.ctx.zones.change_zone(id)?;
        }
        Ok(engine)
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn shader(&self) -> &Shader {
        &self.shader
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Pixel-space projection with the origin in the top-left corner.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection = cgmath::ortho(0.0, width as f32, height as f32, 0.0, -100.0, 100.0);
    }

    /// Runs one frame with the time elapsed since the previous one.
    pub fn frame(&mut self) -> anyhow::Result<()> {
        let dt = self.last_time.elapsed();
        self.last_time = Instant::now();
        self.step(dt.as_secs_f32())
    }

    /// Runs one frame with an explicit delta time in seconds.
    pub fn step(&mut self, time: f32) -> anyhow::Result<()> {
        self.ctx.resources.poll()?;
        self.ctx.bus.update()?;
        self.ctx.zones.update(time);

        self.ctx.gpu.clear(self.clear_color.to_float_array());
        self.shader.use_program();
        self.shader
            .set_uniform("u_projection", self.projection.into())?;
        self.ctx.zones.draw(&self.shader)
    }
}
