use leptos::logging::{error, log, warn};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::bootstrap::{DashboardConfig, PageBootstrap};
use crate::order_client::{drain, Completion, SubmissionQueue, Ticket};
use crate::reorder_core::{Block, BlockId, CoreError, Dashboard, EditMode, MoveOutcome, RegionId};

const BLOCK_CLASS: &str = "device_content";
const MOVE_BUTTON_CLASS: &str = "btn btn-outline-dark hidden";
const ACCEPT_BUTTON_CLASS: &str = "btn btn-outline-success accept";
const EDIT_BUTTON_CLASS: &str = "btn btn-outline-primary edit";

fn control_style(mode: EditMode) -> String {
    format!("display: {};", mode.control_display())
}

fn accept_style(mode: EditMode) -> String {
    format!("display: {};", mode.accept_display())
}

/// Confirm button: queue the current page order, then leave edit mode.
fn confirm_order(
    dashboard: &mut Dashboard,
    queue: &mut SubmissionQueue,
    region: &RegionId,
) -> Result<Option<Ticket>, CoreError> {
    if dashboard.region(region).is_none() {
        return Err(CoreError::UnknownRegion(region.clone()));
    }
    let ticket = queue.enqueue(dashboard.order_submission());
    if dashboard.mode(region).is_editing() {
        dashboard.toggle_edit(region)?;
    }
    Ok(ticket)
}

/// Reactive handle over the dashboard state and the order submission queue.
#[derive(Clone, Copy)]
struct Controller {
    dashboard: RwSignal<Dashboard>,
    queue: StoredValue<SubmissionQueue>,
    endpoint: StoredValue<String>,
}

impl Controller {
    fn new(config: DashboardConfig, dashboard: Dashboard) -> Self {
        Self {
            dashboard: RwSignal::new(dashboard),
            queue: StoredValue::new(SubmissionQueue::default()),
            endpoint: StoredValue::new(config.endpoint),
        }
    }

    fn move_left(self, region: &RegionId, block: &BlockId) {
        self.apply_move(|d| d.move_left(region, block));
    }

    fn move_right(self, region: &RegionId, block: &BlockId) {
        self.apply_move(|d| d.move_right(region, block));
    }

    // Boundary moves change nothing and must not notify.
    fn apply_move(self, op: impl FnOnce(&mut Dashboard) -> Result<MoveOutcome, CoreError>) {
        let mut failure = None;
        self.dashboard.maybe_update(|d| match op(d) {
            Ok(outcome) => outcome.moved,
            Err(err) => {
                failure = Some(err);
                false
            }
        });
        if let Some(err) = failure {
            warn!("move ignored: {}", err);
        }
    }

    fn toggle_edit(self, region: &RegionId) {
        self.dashboard.maybe_update(|d| match d.toggle_edit(region) {
            Ok(_) => true,
            Err(err) => {
                warn!("toggle ignored: {}", err);
                false
            }
        });
    }

    fn confirm(self, region: &RegionId) {
        let mut queue = self.queue.get_value();
        let mut result = None;
        self.dashboard.update(|d| result = Some(confirm_order(d, &mut queue, region)));
        let in_flight = queue.in_flight();
        self.queue.set_value(queue);

        match result {
            Some(Ok(Some(ticket))) => self.spawn_drain(ticket),
            Some(Ok(None)) => log!(
                "order submission queued behind #{}",
                in_flight.unwrap_or_default()
            ),
            Some(Err(err)) => warn!("confirm ignored: {}", err),
            None => {}
        }
    }

    fn spawn_drain(self, ticket: Ticket) {
        let queue = self.queue;
        let endpoint = self.endpoint.get_value();
        spawn_local(async move {
            drain(endpoint, ticket, move |seq| {
                let mut outcome = (Completion::Stale, None);
                queue.update_value(|q| outcome = q.complete(seq));
                outcome
            })
            .await;
        });
    }
}

#[component]
pub fn App() -> impl IntoView {
    let (config, dashboard) = match PageBootstrap::from_window().and_then(PageBootstrap::into_dashboard) {
        Ok(loaded) => loaded,
        Err(err) => {
            error!("dashboard bootstrap failed: {}", err);
            (DashboardConfig::default(), Dashboard::default())
        }
    };
    log!(
        "dashboard ready: {} regions, {} blocks",
        dashboard.regions().len(),
        dashboard.block_count()
    );
    let controller = Controller::new(config, dashboard);

    let regions = Memo::new(move |_| {
        controller.dashboard.with(|d| {
            d.regions()
                .iter()
                .map(|region| (region.id.clone(), region.title.clone()))
                .collect::<Vec<_>>()
        })
    });

    view! {
        <main class="dashboard">
            <For
                each=move || regions.get()
                key=|entry: &(RegionId, String)| entry.0.clone()
                children=move |(region_id, title): (RegionId, String)| {
                    view! { <RegionPanel controller=controller region_id=region_id title=title /> }
                }
            />
        </main>
    }
}

#[component]
fn RegionPanel(controller: Controller, region_id: RegionId, title: String) -> impl IntoView {
    let mode = {
        let id = region_id.clone();
        Memo::new(move |_| controller.dashboard.with(|d| d.mode(&id)))
    };
    let blocks = {
        let id = region_id.clone();
        Memo::new(move |_| {
            controller.dashboard.with(|d| {
                d.region(&id)
                    .map(|region| region.blocks.iter().cloned().collect::<Vec<_>>())
                    .unwrap_or_default()
            })
        })
    };
    let toggle_id = region_id.clone();
    let accept_id = region_id.clone();
    let data_region = region_id.to_string();

    view! {
        <section class="complex" data-region=data_region>
            <header class="complex-header">
                <h2>{title}</h2>
                <button
                    class=EDIT_BUTTON_CLASS
                    aria-pressed=move || mode.get().is_editing().to_string()
                    on:click=move |_| controller.toggle_edit(&toggle_id)
                >
                    "Edit"
                </button>
                <button
                    class=ACCEPT_BUTTON_CLASS
                    style=move || accept_style(mode.get())
                    on:click=move |_| controller.confirm(&accept_id)
                >
                    "Save order"
                </button>
            </header>
            <div class="complex-blocks">
                <For
                    each=move || blocks.get()
                    key=|block: &Block| block.id.clone()
                    children=move |block: Block| {
                        view! {
                            <BlockCard controller=controller region_id=region_id.clone() block=block mode=mode />
                        }
                    }
                />
            </div>
        </section>
    }
}

#[component]
fn BlockCard(controller: Controller, region_id: RegionId, block: Block, mode: Memo<EditMode>) -> impl IntoView {
    let left_region = region_id.clone();
    let left_block = block.id.clone();
    let right_region = region_id;
    let right_block = block.id.clone();

    view! {
        <div class=BLOCK_CLASS id=block.dom_id>
            <button
                class=MOVE_BUTTON_CLASS
                style=move || control_style(mode.get())
                title="Move left"
                on:click=move |_| controller.move_left(&left_region, &left_block)
            >
                "←"
            </button>
            <span class="device-title">{block.title}</span>
            <button
                class=MOVE_BUTTON_CLASS
                style=move || control_style(mode.get())
                title="Move right"
                on:click=move |_| controller.move_right(&right_region, &right_block)
            >
                "→"
            </button>
        </div>
    }
}
