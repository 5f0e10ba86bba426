//! Spinning scene demo
//!
//! Run with:
//!   cargo run --example spinning_scene
//!   cargo run --example spinning_scene -- --width 800 --height 600 --antialias
//!
//! Opens a window, registers a frame listener that spins the scene's only
//! object and slowly cycles the background color, and logs every resize.

use clap::Parser;
use glam::{Vec3, Vec4};
use scene_session::{
    window, Background, Camera, RenderObject, RenderSession, SceneProps, SessionConfig, SurfaceConfig,
    Transform, WgpuSurface,
};

#[derive(Parser, Debug)]
#[command(about = "Render session demo")]
struct Args {
    /// Initial window width
    #[arg(long, default_value_t = 1280)]
    width: u32,
    /// Initial window height
    #[arg(long, default_value_t = 720)]
    height: u32,
    /// Multisample the output
    #[arg(long)]
    antialias: bool,
    /// Render a single frame instead of looping
    #[arg(long)]
    once: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    window::run("Scene Session", args.width, args.height, |host| {
        let mut camera = Camera::perspective(50.0, args.width as f32 / args.height as f32, 1.0, 5000.0);
        camera.set_position(Vec3::new(0.0, 5.0, 20.0));
        camera.look_at(Vec3::ZERO);

        let config = SessionConfig {
            scene: SceneProps {
                background: Some(Some(Background::Color(Vec4::new(0.05, 0.05, 0.1, 1.0)))),
                ..Default::default()
            },
            renderer: SurfaceConfig {
                antialias: args.antialias,
                ..SurfaceConfig::default().with_canvas(host.window())
            },
            ..Default::default()
        };

        let session: RenderSession<WgpuSurface> = RenderSession::new(host.clone(), config, camera)?;

        let cube = session
            .with_scene_mut(|scene| {
                scene.add(RenderObject::new(0, 0).with_transform(Transform::from_position(Vec3::ZERO)))
            })
            .unwrap_or_default();

        let mut elapsed = 0.0f64;
        session.on_render(move |ctx| {
            elapsed += ctx.delta;
            if let Some(object) = ctx.scene.get_mut(cube) {
                object.transform.rotate_y(-0.12 * ctx.delta as f32);
            }
            let t = (elapsed * 0.25).sin() as f32 * 0.5 + 0.5;
            ctx.scene.background = Some(Background::Color(Vec4::new(0.05 + 0.2 * t, 0.05, 0.1 + 0.2 * (1.0 - t), 1.0)));
        });

        session.on_resize(|event| log::info!("Resized to {}x{}", event.width, event.height));

        if args.once {
            session.render_once();
        } else {
            session.start_render();
        }

        Ok(session)
    })?;

    Ok(())
}
