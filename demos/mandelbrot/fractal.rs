const MAX_ITERATIONS: u32 = 1000;

/// Grayscale escape-time rendering of the Mandelbrot set.
pub struct Mandelbrot {
    width: usize,
    height: usize,
    focus_x: f64,
    focus_y: f64,
}

impl Mandelbrot {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            focus_x: 0.380000165,
            focus_y: 0.375,
        }
    }

    /// Returns an RGB24 frame magnified `zoom` times around the focus point.
    pub fn render(&self, zoom: f64) -> Vec<u8> {
        let (width, height) = (self.width as f64, self.height as f64);
        let x_range = width * zoom;
        let y_range = height * zoom;
        let x_start = ((width - x_range) * self.focus_x).round();
        let y_start = ((height - y_range) * self.focus_y).round();

        let mut rgb = vec![0u8; self.width * self.height * 3];

        for (py, row) in rgb.chunks_exact_mut(self.width * 3).enumerate() {
            let y0 = ((py as f64 + 1.0 - y_start) / y_range) * 2.0 - 1.0;

            for (px, pixel) in row.chunks_exact_mut(3).enumerate() {
                let x0 = ((px as f64 + 1.0 - x_start) / x_range) * 3.5 - 2.5;
                let shade = escape_time(x0, y0).min(255) as u8;
                pixel.fill(shade);
            }
        }

        rgb
    }
}

fn escape_time(x0: f64, y0: f64) -> u32 {
    let (mut x, mut y) = (0.0, 0.0);
    let mut iteration = 0;

    while x * x + y * y < 4.0 && iteration < MAX_ITERATIONS {
        let x_next = x * x - y * y + x0;
        y = 2.0 * x * y + y0;
        x = x_next;
        iteration += 1;
    }

    iteration
}
