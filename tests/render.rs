//! End-to-end scenarios exercised against all three strategies.

use std::sync::Arc;

use nalgebra::{Matrix4, Point3, Vector2, Vector3};

use softraster::{Light, Renderer, Rgba8, Strategy};

const ALL_STRATEGIES: [Strategy; 3] = [
    Strategy::ZBuffer,
    Strategy::HierZBuffer,
    Strategy::OctreeHierZBuffer,
];

struct Scene {
    positions: Arc<Vec<Point3<f32>>>,
    colors: Option<Arc<Vec<Vector3<f32>>>>,
    indices: Arc<Vec<u32>>,
}

impl Scene {
    fn new(positions: Vec<Point3<f32>>, colors: Option<Vec<Vector3<f32>>>, indices: Vec<u32>) -> Scene {
        Scene {
            positions: Arc::new(positions),
            colors: colors.map(Arc::new),
            indices: Arc::new(indices),
        }
    }

    fn renderer(&self, strategy: Strategy, size: u32) -> Renderer {
        let mut renderer = Renderer::new(strategy);
        renderer.set_render_size(size, size);
        renderer.set_vertex_data(
            Arc::clone(&self.positions),
            self.colors.clone(),
            Arc::clone(&self.indices),
        );
        renderer
    }

    fn render(&self, strategy: Strategy, size: u32) -> Vec<Rgba8> {
        let mut renderer = self.renderer(strategy, size);
        renderer.render();
        renderer.color_output().to_vec()
    }
}

fn centered_triangle() -> Scene {
    Scene::new(
        vec![
            Point3::new(-0.5, -0.5, -1.0),
            Point3::new(0.5, -0.5, -1.0),
            Point3::new(0.0, 0.5, -1.0),
        ],
        Some(vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ]),
        vec![0, 1, 2],
    )
}

#[test]
fn empty_mesh_renders_a_cleared_buffer() {
    let scene = Scene::new(Vec::new(), None, Vec::new());
    for strategy in ALL_STRATEGIES {
        let frame = scene.render(strategy, 8);
        assert_eq!(frame.len(), 64);
        assert!(frame.iter().all(|px| *px == [0, 0, 0, 0]), "{strategy:?}");
    }
}

#[test]
fn color_output_is_sized_before_the_first_frame() {
    let renderer = centered_triangle().renderer(Strategy::ZBuffer, 4);
    assert_eq!(renderer.color_output().len(), 16);
    assert!(renderer.color_output().iter().all(|px| *px == [0, 0, 0, 0]));
}

#[test]
fn single_triangle_interpolates_vertex_colors() {
    let scene = centered_triangle();
    for strategy in ALL_STRATEGIES {
        let frame = scene.render(strategy, 4);

        let mut expected = vec![[0u8, 0, 0, 0]; 16];
        expected[4 + 1] = [255, 0, 0, 255]; // (1, 1): the red vertex
        expected[4 + 2] = [0, 255, 0, 255]; // (2, 1): span end at the green vertex
        expected[8 + 2] = [127, 0, 127, 255]; // (2, 2): halfway red → blue
        expected[12 + 2] = [0, 0, 255, 255]; // (2, 3): the blue apex
        assert_eq!(frame, expected, "{strategy:?}");
    }
}

/// A far blue triangle first in index order, fully covered by a nearer,
/// larger red one.
fn near_far_scene() -> Scene {
    Scene::new(
        vec![
            Point3::new(-0.4, -0.4, 0.0),
            Point3::new(0.4, -0.4, 0.0),
            Point3::new(0.0, 0.4, 0.0),
            Point3::new(-0.8, -0.8, -0.5),
            Point3::new(0.8, -0.8, -0.5),
            Point3::new(0.0, 0.8, -0.5),
        ],
        Some(vec![
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
        ]),
        vec![0, 1, 2, 3, 4, 5],
    )
}

#[test]
fn near_triangle_occludes_far_triangle() {
    // The near red triangle must win every covered pixel through the depth
    // test, regardless of draw order or strategy.
    let scene = near_far_scene();

    let baseline = scene.render(Strategy::ZBuffer, 64);
    assert!(baseline.iter().any(|px| *px == [255, 0, 0, 255]));
    assert!(
        !baseline.iter().any(|px| *px == [0, 0, 255, 255]),
        "no blue pixel may survive behind the red triangle"
    );
    // Deep inside the far triangle's footprint the near one is what shows.
    assert_eq!(baseline[28 * 64 + 32], [255, 0, 0, 255]);

    for strategy in [Strategy::HierZBuffer, Strategy::OctreeHierZBuffer] {
        assert_eq!(scene.render(strategy, 64), baseline, "{strategy:?}");
    }
}

#[test]
fn clockwise_triangles_are_culled() {
    let scene = Scene::new(
        vec![
            Point3::new(-0.5, -0.5, -1.0),
            Point3::new(0.0, 0.5, -1.0),
            Point3::new(0.5, -0.5, -1.0),
        ],
        None,
        vec![0, 1, 2],
    );
    for strategy in ALL_STRATEGIES {
        let frame = scene.render(strategy, 16);
        assert!(frame.iter().all(|px| *px == [0, 0, 0, 0]), "{strategy:?}");
    }

    // With culling disabled the same triangle rasterizes.
    let mut renderer = scene.renderer(Strategy::ZBuffer, 16);
    renderer.set_backface_culling(false);
    renderer.render();
    assert!(renderer
        .color_output()
        .iter()
        .any(|px| *px == [255, 255, 255, 255]));
}

#[test]
fn a_vertex_on_the_eye_plane_rejects_the_triangle() {
    let scene = centered_triangle();
    for strategy in ALL_STRATEGIES {
        let mut renderer = scene.renderer(strategy, 16);
        // A projection whose w row is -z: the camera sits on z = 0.
        let proj = Matrix4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, -1.0, 0.0,
        );
        renderer.set_projection(&proj);
        // Move the apex onto the eye plane so its w becomes 0.
        renderer.set_vertex_data(
            Arc::new(vec![
                Point3::new(-0.5, -0.5, -1.0),
                Point3::new(0.5, -0.5, -1.0),
                Point3::new(0.0, 0.5, 0.0),
            ]),
            None,
            Arc::new(vec![0, 1, 2]),
        );
        renderer.render();
        assert!(
            renderer.color_output().iter().all(|px| *px == [0, 0, 0, 0]),
            "{strategy:?}"
        );
    }
}

#[test]
fn rendering_twice_is_idempotent() {
    let scene = near_far_scene();
    for strategy in ALL_STRATEGIES {
        let mut renderer = scene.renderer(strategy, 64);
        renderer.render();
        let first = renderer.color_output().to_vec();
        renderer.render();
        assert_eq!(renderer.color_output(), &first[..], "{strategy:?}");
    }
}

#[test]
fn lit_triangle_shades_with_normals() {
    let positions = Arc::new(vec![
        Point3::new(-0.5, -0.5, -1.0),
        Point3::new(0.5, -0.5, -1.0),
        Point3::new(0.0, 0.5, -1.0),
    ]);
    let indices = Arc::new(vec![0u32, 1, 2]);
    let normals = Arc::new(vec![Vector3::new(0.0, 0.0, 1.0)]);
    let normal_indices = Arc::new(vec![0u32, 0, 0]);

    for strategy in ALL_STRATEGIES {
        let mut renderer = Renderer::new(strategy);
        renderer.set_render_size(16, 16);
        renderer.set_vertex_data(Arc::clone(&positions), None, Arc::clone(&indices));
        renderer.set_texture_data(None, None, Some(Arc::clone(&normals)), Some(Arc::clone(&normal_indices)));
        renderer.set_light(&Light::new(
            0.1,
            Vector3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 0.0, 5.0),
            Vector3::new(1.0, 1.0, 1.0),
        ));
        renderer.render();

        // The light faces the triangle head on: ambient plus diffuse
        // saturates every covered pixel.
        let frame = renderer.color_output();
        assert!(frame.iter().any(|px| *px == [255, 255, 255, 255]), "{strategy:?}");
        assert!(
            frame
                .iter()
                .all(|px| *px == [0, 0, 0, 0] || *px == [255, 255, 255, 255]),
            "{strategy:?}"
        );
    }
}

#[test]
fn textured_bind_carries_uvs_but_shades_white() {
    let positions = Arc::new(vec![
        Point3::new(-0.5, -0.5, -1.0),
        Point3::new(0.5, -0.5, -1.0),
        Point3::new(0.0, 0.5, -1.0),
    ]);
    let indices = Arc::new(vec![0u32, 1, 2]);
    let uvs = Arc::new(vec![
        Vector2::new(0.0f32, 0.0),
        Vector2::new(1.0, 0.0),
        Vector2::new(0.5, 1.0),
    ]);
    let uv_indices = Arc::new(vec![0u32, 1, 2]);

    let mut renderer = Renderer::new(Strategy::ZBuffer);
    renderer.set_render_size(16, 16);
    renderer.set_vertex_data_textured(
        positions,
        indices,
        Some(uvs),
        Some(uv_indices),
    );
    renderer.render();

    let frame = renderer.color_output();
    assert!(frame.iter().any(|px| *px == [255, 255, 255, 255]));
    assert!(frame
        .iter()
        .all(|px| *px == [0, 0, 0, 0] || *px == [255, 255, 255, 255]));
}

#[test]
fn strategies_agree_after_rebinding_data() {
    // Rebinding vertex data mid-session must drop stale coherence state.
    let first = near_far_scene();
    let second = centered_triangle();

    let mut frames = Vec::new();
    for strategy in ALL_STRATEGIES {
        let mut renderer = first.renderer(strategy, 64);
        renderer.render();
        renderer.set_vertex_data(
            Arc::clone(&second.positions),
            second.colors.clone(),
            Arc::clone(&second.indices),
        );
        renderer.render();
        frames.push(renderer.color_output().to_vec());
    }
    assert_eq!(frames[0], frames[1]);
    assert_eq!(frames[0], frames[2]);
}

#[test]
fn view_and_projection_compose_into_mvp() {
    // Pushing the camera back two units along +z and projecting with a
    // perspective matrix must still land the triangle mid-screen.
    let scene = centered_triangle();
    let view = nalgebra::Isometry3::look_at_rh(
        &Point3::new(0.0, 0.0, 1.0),
        &Point3::new(0.0, 0.0, -1.0),
        &Vector3::y(),
    )
    .to_homogeneous();
    let proj = nalgebra::Perspective3::new(1.0, 60.0f32.to_radians(), 0.1, 10.0).to_homogeneous();

    let mut frames = Vec::new();
    for strategy in ALL_STRATEGIES {
        let mut renderer = scene.renderer(strategy, 32);
        renderer.set_view(&view);
        renderer.set_projection(&proj);
        renderer.render();
        frames.push(renderer.color_output().to_vec());
    }

    assert!(frames[0].iter().any(|px| px[3] == 255));
    assert_eq!(frames[0], frames[1]);
    assert_eq!(frames[0], frames[2]);
}
