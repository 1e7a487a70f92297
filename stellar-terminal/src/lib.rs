/// Terminal host: drives the scene and draws it as colored ASCII
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use std::io::{stdout, Write};
use std::time::Duration;
use stellar_core::{AppContext, CancelToken, FrameLoop, FrameTick};

pub mod renderer;

pub use renderer::AsciiRenderer;

const ORBIT_STEP: f32 = 0.1;
const ZOOM_STEP: f32 = 1.1;
const PAN_STEP: f32 = 0.05;

/// Main application struct for terminal rendering
pub struct TerminalApp {
    app: AppContext,
    renderer: AsciiRenderer,
    frame_loop: FrameLoop,
    /// Smoothed frame rate for the status line
    fps: f32,
}

impl TerminalApp {
    pub fn new(app: AppContext, max_frames: Option<u64>) -> anyhow::Result<Self> {
        let (width, height) = terminal::size()?;
        let fps = app.config().frame.fps;
        Ok(Self::with_size(app, width as usize, height as usize, fps, max_frames))
    }

    pub fn with_size(app: AppContext, width: usize, height: usize, fps: u32, max_frames: Option<u64>) -> Self {
        Self {
            app,
            renderer: AsciiRenderer::new(width, height),
            frame_loop: FrameLoop::new(fps).with_max_frames(max_frames),
            fps: 0.0,
        }
    }

    /// Token that stops [`TerminalApp::run`] from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.frame_loop.cancel_token()
    }

    pub fn run(&mut self) -> anyhow::Result<u64> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;
        self.app.shutdown();

        result
    }

    fn main_loop(&mut self) -> anyhow::Result<u64> {
        let frame_loop = self.frame_loop.clone();
        let cancel = frame_loop.cancel_token();
        let frames = frame_loop.run(|tick| self.frame(tick, &cancel))?;
        tracing::info!("rendered {frames} frames");
        Ok(frames)
    }

    fn frame(&mut self, tick: FrameTick, cancel: &CancelToken) -> anyhow::Result<()> {
        while event::poll(Duration::from_millis(0))? {
            if !self.handle_event(event::read()?, cancel) {
                // Quit requested: skip drawing, the loop exits next
                return Ok(());
            }
        }

        let viewport = self.renderer.viewport();
        let output = self.app.tick(&viewport)?;
        for name in &output.attached {
            tracing::debug!("{name} appeared in frame {}", output.frame);
        }

        self.renderer.render_scene(self.app.scene(), self.app.camera());
        if let (Some(anchor), Some(button)) = (output.overlay, self.app.overlay_button()) {
            self.renderer.draw_overlay(&anchor, &button.label);
        }
        self.present()?;
        self.update_fps(tick.delta);
        Ok(())
    }

    fn update_fps(&mut self, delta: Duration) {
        let secs = delta.as_secs_f32();
        if secs <= 0.0 {
            return;
        }
        let current = 1.0 / secs;
        self.fps = if self.fps == 0.0 {
            current
        } else {
            self.fps * 0.9 + current * 0.1
        };
    }

    /// Apply one terminal event. Returns false once the app should quit.
    pub fn handle_event(&mut self, event: Event, cancel: &CancelToken) -> bool {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key, cancel),
            Event::Resize(width, height) => {
                tracing::debug!("terminal resized to {width}x{height}");
                self.renderer.resize(width as usize, height as usize);
                self.app.set_viewport(&self.renderer.viewport());
            }
            _ => {}
        }
        !cancel.is_cancelled()
    }

    fn handle_key(&mut self, key: KeyEvent, cancel: &CancelToken) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => cancel.cancel(),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => cancel.cancel(),
            KeyCode::Char('w') | KeyCode::Up => self.app.orbit(0.0, -ORBIT_STEP),
            KeyCode::Char('s') | KeyCode::Down => self.app.orbit(0.0, ORBIT_STEP),
            KeyCode::Char('a') | KeyCode::Left => self.app.orbit(-ORBIT_STEP, 0.0),
            KeyCode::Char('d') | KeyCode::Right => self.app.orbit(ORBIT_STEP, 0.0),
            KeyCode::Char('+') | KeyCode::Char('=') => self.app.zoom(1.0 / ZOOM_STEP),
            KeyCode::Char('-') => self.app.zoom(ZOOM_STEP),
            KeyCode::Char('h') => self.app.pan(-PAN_STEP, 0.0),
            KeyCode::Char('l') => self.app.pan(PAN_STEP, 0.0),
            KeyCode::Char('k') => self.app.pan(0.0, PAN_STEP),
            KeyCode::Char('j') => self.app.pan(0.0, -PAN_STEP),
            KeyCode::Char('r') => self.app.reset_view(),
            _ => {}
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.app
    }

    pub fn renderer(&self) -> &AsciiRenderer {
        &self.renderer
    }

    fn present(&mut self) -> std::io::Result<()> {
        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;

        self.renderer.draw(&mut stdout)?;

        let loading = match self.app.pending_loads() {
            0 => String::new(),
            n => format!(" | loading {n}"),
        };
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "Stellar | FPS: {:.1}{} | WASD/Arrows=Orbit +/-=Zoom HJKL=Pan R=Reset Q=Quit",
                self.fps, loading
            )),
            ResetColor
        )?;

        stdout.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;
    use stellar_core::{AssetLoader, SceneConfig};

    fn app() -> TerminalApp {
        let mut config = SceneConfig::default();
        config.starfield.count = 0;
        let renderer = AsciiRenderer::new(80, 24);
        let context = AppContext::init(config, &AssetLoader::inline(), renderer.viewport()).unwrap();
        TerminalApp::with_size(context, 80, 24, 30, Some(1))
    }

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn quit_key_cancels() {
        let mut app = app();
        let cancel = app.cancel_token();
        assert!(app.handle_event(key('d'), &cancel));
        assert!(!app.handle_event(key('q'), &cancel));
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn resize_updates_renderer() {
        let mut app = app();
        let cancel = app.cancel_token();
        app.handle_event(Event::Resize(100, 30), &cancel);
        assert_eq!(app.renderer().width(), 100);
        assert_eq!(app.renderer().height(), 30);
        let aspect = app.context().camera().aspect;
        assert!((aspect - 100.0 / 60.0).abs() < 1e-5);
    }

    #[test]
    fn fps_follows_frame_delta() {
        let mut app = app();
        app.update_fps(Duration::ZERO);
        assert_eq!(app.fps, 0.0);
        for _ in 0..50 {
            app.update_fps(Duration::from_millis(20));
        }
        assert!((app.fps - 50.0).abs() < 0.5);
    }
}
