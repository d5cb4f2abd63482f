#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::path::{Path, PathBuf};

use eframe::egui;

use img2ico::config::Config;
use img2ico::request::{MAX_CORNER_RADIUS, MAX_DIMENSION, MIN_DIMENSION};
use img2ico::{ConversionRequest, IconConverter, ico};

const PREVIEW_SIZE: f32 = 160.0;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([500.0, 520.0])
        .with_min_inner_size([420.0, 400.0])
        .with_drag_and_drop(true);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Image Converter To Ico",
        options,
        Box::new(|cc| Ok(Box::new(App::new(cc)))),
    )
}

// ── Main application state ──────────────────────────────────────────

struct App {
    config: Config,
    selected_file: Option<PathBuf>,
    width: u32,
    height: u32,
    corner_radius: u32,
    output_folder: String,
    status: Status,
    /// Thumbnail of the selected source image.
    source_texture: Option<egui::TextureHandle>,
    /// Thumbnail of the last icon written.
    result_texture: Option<egui::TextureHandle>,
}

enum Status {
    Idle,
    Converted(PathBuf),
    Error(String),
}

impl App {
    fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let config = Config::load(None).unwrap_or_else(|e| {
            log::warn!("Ignoring unreadable config: {e:#}");
            Config::default()
        });

        Self {
            width: config.defaults.width.clamp(MIN_DIMENSION, MAX_DIMENSION),
            height: config.defaults.height.clamp(MIN_DIMENSION, MAX_DIMENSION),
            corner_radius: config.defaults.corner_radius.min(MAX_CORNER_RADIUS),
            output_folder: config.output_dir().unwrap_or_default().to_string(),
            config,
            selected_file: None,
            status: Status::Idle,
            source_texture: None,
            result_texture: None,
        }
    }

    fn select_file(&mut self, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Select Image File")
            .add_filter("Images", &["jpg", "jpeg", "png"])
            .pick_file()
        {
            self.set_source(ctx, path);
        }
    }

    fn select_folder(&mut self) {
        if let Some(dir) = rfd::FileDialog::new()
            .set_title("Select Output Folder")
            .pick_folder()
        {
            self.output_folder = dir.display().to_string();
        }
    }

    fn set_source(&mut self, ctx: &egui::Context, path: PathBuf) {
        self.source_texture = load_texture(ctx, "source", &path);
        self.result_texture = None;
        self.status = Status::Idle;
        self.selected_file = Some(path);
    }

    /// Runs the conversion synchronously inside the click handler.
    fn convert(&mut self, ctx: &egui::Context) {
        let Some(source) = self.selected_file.clone() else {
            self.status = Status::Error("Please select a file first.".into());
            return;
        };

        let request = ConversionRequest::builder(source)
            .size(self.width, self.height)
            .corner_radius(self.corner_radius)
            .output_dir(self.output_folder.trim())
            .alpha_mode(self.config.output.alpha_mode)
            .build();

        let result = request.and_then(|r| IconConverter::new().convert(&r));
        match result {
            Ok(outcome) => {
                self.result_texture = load_icon_texture(ctx, &outcome.output_path);
                self.status = Status::Converted(outcome.output_path);
            }
            Err(e) => {
                log::error!("Conversion failed: {e}");
                self.result_texture = None;
                self.status = Status::Error(e.to_string());
            }
        }
    }
}

fn load_texture(ctx: &egui::Context, name: &str, path: &Path) -> Option<egui::TextureHandle> {
    let rgba = preview_rgba(image::open(path).ok()?);
    Some(texture_from_rgba(ctx, name, &rgba))
}

/// Shrink a source image to thumbnail size before it becomes a texture.
fn preview_rgba(img: image::DynamicImage) -> image::RgbaImage {
    let side = PREVIEW_SIZE as u32 * 2;
    if img.width() > side || img.height() > side {
        img.thumbnail(side, side).into_rgba8()
    } else {
        img.into_rgba8()
    }
}

fn load_icon_texture(ctx: &egui::Context, path: &Path) -> Option<egui::TextureHandle> {
    let bytes = std::fs::read(path).ok()?;
    let rgba = ico::decode_frame(&bytes).ok()?;
    Some(texture_from_rgba(ctx, "result", &rgba))
}

fn texture_from_rgba(ctx: &egui::Context, name: &str, rgba: &image::RgbaImage) -> egui::TextureHandle {
    let (w, h) = rgba.dimensions();
    let color = egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], rgba.as_raw());
    ctx.load_texture(name, color, egui::TextureOptions::default())
}

fn show_thumbnail(ui: &mut egui::Ui, texture: &egui::TextureHandle) {
    let size = texture.size_vec2();
    let scale = (PREVIEW_SIZE / size.x.max(size.y)).min(1.0);
    ui.image(egui::load::SizedTexture::new(texture.id(), size * scale));
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle dropped files
        let dropped: Option<PathBuf> = ctx.input(|i| {
            i.raw.dropped_files.iter().find_map(|f| f.path.clone())
        });
        if let Some(path) = dropped {
            self.set_source(ctx, path);
        }

        // ── Status line ─────────────────────────────────────────────
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.add_space(4.0);
            match &self.status {
                Status::Idle => {
                    ui.label("");
                }
                Status::Converted(path) => {
                    ui.label(
                        egui::RichText::new(format!("Converted to: {}", path.display()))
                            .color(egui::Color32::from_rgb(76, 175, 80)),
                    );
                }
                Status::Error(msg) => {
                    ui.label(egui::RichText::new(format!("Error: {msg}")).color(egui::Color32::RED));
                }
            }
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);
            match &self.selected_file {
                Some(path) => {
                    let name = path
                        .file_name()
                        .map(|f| f.to_string_lossy().to_string())
                        .unwrap_or_else(|| path.display().to_string());
                    ui.label(format!("Selected: {name}"));
                }
                None => {
                    ui.label("Select a JPG or PNG file to convert");
                }
            }
            if ui.button("📂 Select File").clicked() {
                self.select_file(ctx);
            }

            ui.add_space(12.0);
            ui.label("Output size (width x height):");
            ui.horizontal(|ui| {
                ui.add(
                    egui::DragValue::new(&mut self.width)
                        .range(MIN_DIMENSION..=MAX_DIMENSION)
                        .suffix(" px"),
                );
                ui.label("x");
                ui.add(
                    egui::DragValue::new(&mut self.height)
                        .range(MIN_DIMENSION..=MAX_DIMENSION)
                        .suffix(" px"),
                );
            });

            ui.add_space(8.0);
            ui.label("Corner radius:");
            ui.add(
                egui::DragValue::new(&mut self.corner_radius)
                    .range(0..=MAX_CORNER_RADIUS)
                    .suffix(" px"),
            );

            ui.add_space(8.0);
            ui.label("Output folder (default: current directory):");
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut self.output_folder);
                if ui.button("📁 Select Folder").clicked() {
                    self.select_folder();
                }
            });

            ui.add_space(12.0);
            if ui.button("▶ Convert to ICO").clicked() {
                self.convert(ctx);
            }

            ui.add_space(12.0);
            ui.separator();
            ui.horizontal(|ui| {
                if let Some(ref tex) = self.source_texture {
                    ui.vertical(|ui| {
                        ui.label(egui::RichText::new("Source").small().color(egui::Color32::GRAY));
                        show_thumbnail(ui, tex);
                    });
                }
                if let Some(ref tex) = self.result_texture {
                    ui.vertical(|ui| {
                        ui.label(egui::RichText::new("Icon").small().color(egui::Color32::GRAY));
                        show_thumbnail(ui, tex);
                    });
                }
            });
        });
    }
}
