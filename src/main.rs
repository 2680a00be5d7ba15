//! Bench driver: loads an OBJ model, renders it with the selected
//! strategies and reports average frame times.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use nalgebra::{Isometry3, Matrix4, Perspective3, Point3, Vector3};
use tracing::info;
use tracing_subscriber::EnvFilter;

use softraster::mesh::Mesh;
use softraster::{Light, Renderer, Rgba8, Strategy};

#[derive(Parser, Debug)]
#[command(name = "softraster", version, about = "Hierarchical Z-buffer software rasterizer")]
struct Args {
    /// Path of the OBJ model to render.
    #[arg(short = 'm', long = "model")]
    model: PathBuf,
    /// Strategy: 0 = z-buffer, 1 = hierarchical, 2 = octree. Omit to bench
    /// all three.
    #[arg(short = 'r', long = "rasterizer")]
    rasterizer: Option<u8>,
    /// Frames to render per strategy.
    #[arg(short = 't', long = "times", default_value_t = 20)]
    times: u32,
    /// Square render size in pixels.
    #[arg(long = "size", default_value_t = 1024)]
    size: u32,
    /// Write the last rendered frame to this PNG path.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

fn strategy_name(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::ZBuffer => "z-buffer",
        Strategy::HierZBuffer => "hierarchical z-buffer",
        Strategy::OctreeHierZBuffer => "octree hierarchical z-buffer",
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let strategies = match args.rasterizer {
        None => vec![
            Strategy::ZBuffer,
            Strategy::HierZBuffer,
            Strategy::OctreeHierZBuffer,
        ],
        Some(0) => vec![Strategy::ZBuffer],
        Some(1) => vec![Strategy::HierZBuffer],
        Some(2) => vec![Strategy::OctreeHierZBuffer],
        Some(other) => bail!("unknown rasterizer {other}, expected 0, 1 or 2"),
    };

    let mesh = Mesh::load_obj(&args.model)
        .with_context(|| format!("loading {}", args.model.display()))?;
    info!(
        model = %args.model.display(),
        vertices = mesh.positions.len(),
        faces = mesh.indices.len() / 3,
        "model loaded"
    );
    let buffers = mesh.into_buffers();

    let eye = Point3::new(5.0, 5.0, 5.0);
    let view = Isometry3::look_at_rh(&eye, &Point3::origin(), &Vector3::y()).to_homogeneous();
    let proj = Perspective3::new(1.0, 60.0f32.to_radians(), 0.01, 10.0).to_homogeneous();
    let light = Light::new(
        0.1,
        Vector3::new(1.0, 1.0, 1.0),
        Point3::new(0.0, 5.0, 0.0),
        Vector3::new(0.6, 0.5, 0.8),
    );

    for &strategy in &strategies {
        let mut renderer = Renderer::new(strategy);
        renderer.set_render_size(args.size, args.size);
        renderer.set_vertex_data(
            Arc::clone(&buffers.positions),
            None,
            Arc::clone(&buffers.indices),
        );
        renderer.set_texture_data(
            buffers.uvs.clone(),
            buffers.uv_indices.clone(),
            buffers.normals.clone(),
            buffers.normal_indices.clone(),
        );
        renderer.set_model(&Matrix4::identity());
        renderer.set_view(&view);
        renderer.set_projection(&proj);
        renderer.set_light(&light);

        let start = Instant::now();
        for _ in 0..args.times.max(1) {
            renderer.render();
        }
        let elapsed = start.elapsed();

        println!("rasterizer: {}", strategy_name(strategy));
        println!(
            ">> avg frame time ({} frames): {:.3} ms",
            args.times.max(1),
            elapsed.as_secs_f64() * 1000.0 / f64::from(args.times.max(1))
        );

        if let Some(path) = &args.output {
            let path = output_path(path, strategy, strategies.len() > 1);
            save_png(&path, renderer.color_output(), args.size, args.size)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(">> frame written to {}", path.display());
        }
    }

    Ok(())
}

/// With several strategies on one run, each frame gets its own file.
fn output_path(base: &PathBuf, strategy: Strategy, tagged: bool) -> PathBuf {
    if !tagged {
        return base.clone();
    }
    let stem = base.file_stem().unwrap_or_default().to_string_lossy();
    let tag = match strategy {
        Strategy::ZBuffer => "zbuf",
        Strategy::HierZBuffer => "hiz",
        Strategy::OctreeHierZBuffer => "octree",
    };
    base.with_file_name(format!("{stem}-{tag}.png"))
}

/// The renderer's rows run bottom-up; images run top-down.
fn save_png(path: &std::path::Path, pixels: &[Rgba8], width: u32, height: u32) -> Result<()> {
    let mut raw = Vec::with_capacity(pixels.len() * 4);
    for y in (0..height as usize).rev() {
        let row = &pixels[y * width as usize..(y + 1) * width as usize];
        raw.extend(row.iter().flat_map(|px| px.iter().copied()));
    }
    let image = image::RgbaImage::from_raw(width, height, raw)
        .context("pixel buffer does not match the render size")?;
    image.save(path)?;
    Ok(())
}
