use std::time::Duration;
use std::time::Instant;

use thiserror::Error;
use winit::error::EventLoopError;
use winit::error::OsError;
use winit::event::WindowEvent;
use winit::event_loop::ControlFlow;
use winit::event_loop::EventLoop;
use winit::window::WindowBuilder;

/// # Application
///
/// Entry-point for building a Marrow application.
pub trait Application: Sized {
    /// Returns the title to be displayed in the application window.
    fn title(&self) -> &str;

    /// Returns the current state of the application. The application will exit if this returns
    /// [ApplicationState::Finished] after [Application::handle_event] or [Application::simulate]
    /// is called.
    fn state(&self) -> ApplicationState;

    /// Handles the incoming event.
    fn handle_event(&mut self, event: Event);

    /// Advances the application by the time elapsed since the previous frame.
    fn simulate(&mut self, dt: Duration);

    /// Runs the application until it reports [ApplicationState::Finished] or the window system
    /// fails.
    fn run(self) -> Result<(), ApplicationError> {
        run_application(self)
    }
}

/// # Application State
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ApplicationState {
    /// Application is running.
    Running,
    /// Application has finished running.
    Finished,
}

/// # Event
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Event {
    /// Application window requested to close.
    CloseRequested,
    /// Application window was resized to the given width and height in pixels.
    Resized(u32, u32),
    /// Application window gained or lost focus.
    Focused(bool),
}

/// # Application Error
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The event loop could not be created or failed while running.
    #[error("event loop failed: {0}")]
    EventLoop(#[from] EventLoopError),
    /// The window could not be created.
    #[error("failed to create window: {0}")]
    Window(#[from] OsError),
}

fn run_application(mut app: impl Application) -> Result<(), ApplicationError> {
    let event_loop = EventLoop::new()?;
    let mut window_title = app.title().to_string();
    let window = WindowBuilder::new()
        .with_title(&window_title)
        .build(&event_loop)?;
    let mut last_frame = Instant::now();

    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run(|event, event_loop_window_target| {
        match event {
            winit::event::Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    app.handle_event(Event::CloseRequested);
                }
                WindowEvent::Resized(size) => {
                    app.handle_event(Event::Resized(size.width, size.height));
                }
                WindowEvent::Focused(focused) => {
                    app.handle_event(Event::Focused(focused));
                }
                _ => {}
            },
            winit::event::Event::AboutToWait => {
                let now = Instant::now();
                app.simulate(now - last_frame);
                last_frame = now;

                let title = app.title();
                if title != window_title {
                    window_title = title.to_string();
                    window.set_title(&window_title);
                }
            }
            _ => {}
        }

        if app.state() == ApplicationState::Finished {
            event_loop_window_target.exit();
        }
    })?;

    Ok(())
}
