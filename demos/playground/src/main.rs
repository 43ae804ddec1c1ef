use std::env;
use std::rc::Rc;
use std::time::Duration;

use marrow::iqm::IqmImporter;
use marrow::systems::PlayAnimation;
use marrow::systems::RenderList;
use marrow::systems::SceneGraph;
use marrow::systems::SkeletalAnimator;
use marrow::systems::PLAY_ANIMATION;
use marrow::Application;
use marrow::ApplicationState;
use marrow::BufferedDiagnostics;
use marrow::Event;
use marrow::MaterialId;
use marrow::MeshId;
use marrow::Model;
use marrow::Scene;
use marrow::State;
use marrow::StateId;
use marrow::StateStack;
use marrow::Transform;

const VIEWER: StateId = StateId(0);

struct Viewer {
    scene: Scene,
    elapsed: Duration,
}

impl Viewer {
    fn new(path: Option<&str>, diagnostics: Rc<BufferedDiagnostics>) -> Self {
        let mut scene = Scene::with_diagnostics(diagnostics.clone());
        if let Err(error) = scene.add_system(SkeletalAnimator::new) {
            log::error!("{error}");
        }
        if let Err(error) = scene.add_system(SceneGraph::new) {
            log::error!("{error}");
        }
        if let Err(error) = scene.add_system(RenderList::new) {
            log::error!("{error}");
        }

        if let Some(path) = path {
            let (mesh, skeleton) = IqmImporter::new(&*diagnostics).import_file(path);
            log::info!(
                "{path}: {} vertices, {} submeshes, {} joints, {} animations",
                mesh.vertex_count,
                mesh.submeshes.len(),
                skeleton.joint_count(),
                skeleton.animations.len()
            );

            let has_animation = !skeleton.animations.is_empty();
            let entity = scene.create_entity();
            let components = scene
                .add_component(entity, Transform::IDENTITY)
                .and_then(|_| scene.add_component(entity, Model::new(MeshId(0), MaterialId(0))))
                .and_then(|_| scene.add_component(entity, skeleton));
            if let Err(error) = components {
                log::error!("{error}");
            }

            if has_animation {
                scene.post_message(
                    PLAY_ANIMATION,
                    PlayAnimation {
                        entity,
                        animation: 0,
                    },
                );
            }
        }

        Self {
            scene,
            elapsed: Duration::ZERO,
        }
    }
}

impl State for Viewer {
    fn simulate(&mut self, dt: Duration) -> bool {
        self.scene.simulate(dt);

        self.elapsed += dt;
        if self.elapsed >= Duration::from_secs(1) {
            self.elapsed = Duration::ZERO;
            if let Some(render_list) = self.scene.system::<RenderList>() {
                log::debug!("{} draw items", render_list.len());
            }
        }

        true
    }
}

struct Playground {
    state: ApplicationState,
    states: StateStack,
}

impl Playground {
    fn new(path: Option<String>) -> Self {
        let diagnostics = Rc::new(BufferedDiagnostics::default());
        let mut states = StateStack::new(diagnostics.clone());
        states.register(VIEWER, move || Viewer::new(path.as_deref(), diagnostics.clone()));
        states.push(VIEWER);

        Self {
            state: ApplicationState::Running,
            states,
        }
    }
}

impl Application for Playground {
    fn title(&self) -> &str {
        "Marrow Playground"
    }

    fn state(&self) -> ApplicationState {
        self.state
    }

    fn handle_event(&mut self, event: Event) {
        self.states.handle_event(&event);

        if event == Event::CloseRequested {
            self.state = ApplicationState::Finished;
        }
    }

    fn simulate(&mut self, dt: Duration) {
        self.states.simulate(dt);
    }
}

fn main() {
    env_logger::init();

    let path = env::args().nth(1);
    if let Err(error) = Playground::new(path).run() {
        log::error!("{error}");
    }
}
