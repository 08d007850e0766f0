use fractal_core::{
    coloring, Color, ComplexBig, Fractal, FractalKind, Mandelbrot, PixelSize, RenderConfig,
};

/// Evaluate the top-left corner of every pixel in the configured image.
fn render_grid(fractal: &dyn Fractal, config: &RenderConfig) -> Vec<u64> {
    let PixelSize { width, height } = config.image_size;
    let mut results = Vec::with_capacity(config.image_size.area());
    for py in 0..height {
        for px in 0..width {
            let c = config.pixel_to_fractal_low(px as f64, py as f64);
            results.push(fractal.iter_coord_low(c).0);
        }
    }
    results
}

fn scenario_config() -> RenderConfig {
    RenderConfig {
        max_iters: 100,
        bail: 4.0,
        precision: 64,
        anti_alias: 1,
        image_size: PixelSize::new(10, 10),
        frac_top_left: ComplexBig::from_f64(-2.0, -1.5, 64),
        frac_size: ComplexBig::from_f64(3.0, 3.0, 64),
        ..RenderConfig::default()
    }
}

#[test]
fn headless_mandelbrot_render() {
    let config = scenario_config();
    let mandelbrot = Mandelbrot::new(config.clone());
    let results = render_grid(&mandelbrot, &config);

    assert_eq!(results.len(), 100);
    let interior = results.iter().filter(|&&n| n == config.max_iters).count();
    assert!(interior > 0, "should have some interior points");
    assert!(interior < 100, "should have some escaped points");

    // Far top-left corner escapes; pixel (7, 5) sits at 0.1 + 0i, inside the cardioid.
    assert!(results[0] < config.max_iters);
    assert_eq!(results[5 * 10 + 7], config.max_iters);
}

#[test]
fn headless_render_is_deterministic() {
    let config = scenario_config();
    for kind in FractalKind::ALL {
        let fractal = kind.build(&config);
        assert_eq!(
            render_grid(fractal.as_ref(), &config),
            render_grid(fractal.as_ref(), &config),
            "{} renders must be repeatable",
            kind.name()
        );
    }
}

#[test]
fn headless_julia_render() {
    let config = RenderConfig {
        frac_top_left: ComplexBig::from_f64(-1.6, -1.2, 64),
        frac_size: ComplexBig::from_f64(3.2, 2.4, 64),
        image_size: PixelSize::new(64, 48),
        max_iters: 128,
        ..RenderConfig::default()
    };
    let julia = FractalKind::Julia.build(&config);
    let palette = config.palette.clone();
    let algo = julia.coloring(coloring::STEPPED_GRADIENTS).unwrap();

    let mut black = 0;
    let mut colored = 0;
    for py in 0..48 {
        for px in 0..64 {
            let z0 = config.pixel_to_fractal_low(px as f64, py as f64);
            let (iters, z) = julia.iter_coord_low(z0);
            if julia.color_low(z, iters, &palette, &algo) == Color::BLACK {
                black += 1;
            } else {
                colored += 1;
            }
        }
    }
    assert!(black > 0, "should have some interior points");
    assert!(colored > 0, "should have some escaped points");
}

#[test]
fn newton_basins_cover_all_three_roots() {
    let config = RenderConfig {
        frac_top_left: ComplexBig::from_f64(-2.0, -2.0, 64),
        frac_size: ComplexBig::from_f64(4.0, 4.0, 64),
        image_size: PixelSize::new(32, 32),
        max_iters: 64,
        ..RenderConfig::default()
    };
    let newton = FractalKind::Newton.build(&config);
    let results = render_grid(newton.as_ref(), &config);
    for root in 0..3 {
        assert!(results.contains(&root), "root {root} never reached");
    }
    assert!(results.iter().all(|&r| r < 3));
}
