//! Application state and the reducer that keeps it consistent.
//!
//! All user intents go through [`AppStore::dispatch`]. The store owns the
//! catalog, the garage and the advisor gateway; [`AppState`] is the part that
//! lives only for the session.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::advisory::{
    AdvisorState, AdvisoryError, AdvisoryGateway, AdvisoryResponse, AdvisoryTicket,
    AdvisoryTransport,
};
use crate::app_response::AppResponse;
use crate::build_model::{BuildDraft, BuildPatch, UserConfiguration};
use crate::build_repository::{BuildRepository, QuotaUsage};
use crate::calculator::{cubic_inches, CalculatorField, Calculators, DeckField};
use crate::catalog::{PartCategoryView, ReferenceCatalog};
use crate::catalog_model::{Engine, EngineKey, ProvenConfiguration};
use crate::comparison::{ComparisonRow, ComparisonTable};
use crate::kv_store::KeyValueStore;
use crate::selection::{EngineResolution, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetailTab {
    #[default]
    Specs,
    AiAdvisor,
    Builds,
    Compare,
    Upgrades,
    CrCalculator,
}

/// Session state derived from the user's choices.
///
/// `current_engine` is `Some` exactly when `selection` is
/// [`Selection::EngineSelected`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub selection: Selection,
    pub current_engine: Option<Engine>,
    pub detail_tab: DetailTab,
    pub calculators: Calculators,
    pub advisor: AdvisorState,
    pub comparison: ComparisonTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    SelectMake { make: String },
    SelectModel { model: String },
    SelectEngine { engine_code: String },
    SetDetailTab { tab: DetailTab },

    SetCalculatorField { field: CalculatorField, value: String },
    SetDeckField { field: DeckField, value: String },
    ComputeDeckClearance,
    ApplyDeckClearance,
    /// Copies one compression field from another catalog engine.
    LoadCalculatorFieldFromEngine { field: CalculatorField, engine: EngineKey },
    ResetCalculators,

    /// Adds `engine`, or the current engine when absent.
    AddToComparison {
        #[serde(default)]
        engine: Option<EngineKey>,
    },
    RemoveFromComparison { index: usize },
    ClearComparison,

    CreateBuild { draft: BuildDraft },
    UpdateBuild { id: String, patch: BuildPatch },
    DeleteBuild { id: String },
    ToggleBuildVisibility { id: String },
    LikeBuild { id: String },
    SetPremium { premium: bool },
    TogglePremium,

    OpenConversation,
    SetBuildGoals { horsepower_goal: String, budget: String },
    RequestAnalysis,
    RequestBuildPath,
    SendChatMessage { message: String },
}

/// Serializable view of everything the host renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSnapshot<'a> {
    pub selection: &'a Selection,
    pub makes: Vec<String>,
    pub models: Vec<String>,
    pub engine_codes: Vec<String>,
    pub current_engine: Option<&'a Engine>,
    pub cubic_inches: Option<f64>,
    pub detail_tab: DetailTab,
    pub calculators: &'a Calculators,
    pub compression_ratio: Option<f64>,
    pub has_upgrade_data: bool,
    pub upgrades: Vec<PartCategoryView>,
    pub proven_configurations: &'a [ProvenConfiguration],
    pub comparison: Vec<EngineKey>,
    pub comparison_rows: Vec<ComparisonRow>,
    pub builds: &'a [UserConfiguration],
    pub build_quota: QuotaUsage,
    pub premium: bool,
    pub advisor_available: bool,
    pub advisor: &'a AdvisorState,
}

pub struct AppStore<S: KeyValueStore> {
    catalog: ReferenceCatalog,
    state: AppState,
    builds: BuildRepository<S>,
    gateway: AdvisoryGateway,
}

fn no_engine() -> AppResponse {
    AppResponse::ValidationError("Select an engine first.".to_string())
}

impl<S: KeyValueStore> AppStore<S> {
    pub fn new(catalog: ReferenceCatalog, store: S, gateway: AdvisoryGateway) -> Self {
        Self {
            catalog,
            state: AppState::default(),
            builds: BuildRepository::load(store),
            gateway,
        }
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn builds(&self) -> &BuildRepository<S> {
        &self.builds
    }

    pub fn gateway(&self) -> &AdvisoryGateway {
        &self.gateway
    }

    /// Connects the advisor to the host's transport. Requests go out with the
    /// models the gateway was configured with.
    pub fn set_transport(&mut self, transport: Box<dyn AdvisoryTransport>) {
        info!(
            "AI advisor connected (analysis model {}, build path model {})",
            self.gateway.models().analysis,
            self.gateway.models().build_path
        );
        self.gateway.connect(transport);
    }

    pub fn into_store(self) -> S {
        self.builds.into_store()
    }

    pub fn dispatch(&mut self, action: Action) -> Result<(), AppResponse> {
        debug!("Dispatching {action:?}");

        match action {
            Action::SelectMake { make } => {
                self.state.selection.select_make(&make);
                self.set_engine(None);
            }
            Action::SelectModel { model } => {
                self.state.selection.select_model(&model)?;
                self.set_engine(None);
            }
            Action::SelectEngine { engine_code } => {
                match self.state.selection.select_engine(&engine_code, &self.catalog)? {
                    EngineResolution::Resolved(engine) => self.set_engine(Some(engine)),
                    EngineResolution::Unresolved => {
                        info!("Engine code {engine_code} not found, selection reset");
                        self.set_engine(None);
                    }
                }
            }
            Action::SetDetailTab { tab } => self.state.detail_tab = tab,

            Action::SetCalculatorField { field, value } => {
                self.state.calculators.input.set(field, value)
            }
            Action::SetDeckField { field, value } => {
                self.state.calculators.deck_input.set(field, value)
            }
            // Incomplete calculator input withholds the result instead of failing.
            Action::ComputeDeckClearance => {
                self.state.calculators.compute_deck_clearance();
            }
            Action::ApplyDeckClearance => {
                if !self.state.calculators.apply_deck_clearance() {
                    debug!("No deck clearance to apply");
                }
            }
            Action::LoadCalculatorFieldFromEngine { field, engine } => {
                let source = self.catalog.find_engine(&engine).ok_or_else(|| {
                    AppResponse::NotFound(format!("Engine {engine} is not in the catalog"))
                })?;
                if !self.state.calculators.load_field_from(field, source) {
                    debug!("{engine} has no value for {field:?}");
                }
            }
            Action::ResetCalculators => {
                let engine = self.state.current_engine.as_ref().ok_or_else(no_engine)?;
                self.state.calculators = Calculators::for_engine(engine);
            }

            Action::AddToComparison { engine } => {
                let engine = match engine {
                    Some(key) => self.catalog.find_engine(&key).ok_or_else(|| {
                        AppResponse::NotFound(format!("Engine {key} is not in the catalog"))
                    })?,
                    None => self.state.current_engine.as_ref().ok_or_else(no_engine)?,
                };
                self.state.comparison.add(engine, self.builds.is_premium())?;
            }
            Action::RemoveFromComparison { index } => {
                self.state.comparison.remove(index);
            }
            Action::ClearComparison => self.state.comparison.clear(),

            Action::CreateBuild { draft } => {
                self.builds
                    .create(&draft, self.state.current_engine.as_ref(), &self.catalog)?;
            }
            Action::UpdateBuild { id, patch } => {
                self.builds.update(&id, &patch, &self.catalog)?;
            }
            Action::DeleteBuild { id } => {
                self.builds.delete(&id)?;
            }
            Action::ToggleBuildVisibility { id } => {
                self.builds.toggle_visibility(&id)?;
            }
            Action::LikeBuild { id } => {
                self.builds.like(&id)?;
            }
            Action::SetPremium { premium } => self.builds.set_premium(premium)?,
            Action::TogglePremium => {
                let premium = !self.builds.is_premium();
                self.builds.set_premium(premium)?;
            }

            Action::OpenConversation => {
                let engine = self.state.current_engine.as_ref().ok_or_else(no_engine)?;
                self.state.advisor.open_conversation(engine);
            }
            Action::SetBuildGoals {
                horsepower_goal,
                budget,
            } => self.state.advisor.set_goals(horsepower_goal, budget),
            Action::RequestAnalysis => {
                let ticket = self.begin_analysis()?;
                self.run(ticket)?;
            }
            Action::RequestBuildPath => {
                let ticket = self.begin_build_path()?;
                self.run(ticket)?;
            }
            Action::SendChatMessage { message } => {
                let ticket = self.begin_chat(&message)?;
                self.run(ticket)?;
            }
        }
        Ok(())
    }

    /// Installs a new current engine (or none) and resets everything that
    /// belonged to the previous one.
    fn set_engine(&mut self, engine: Option<Engine>) {
        let state = &mut self.state;
        state.advisor.reset();
        state.calculators = engine.as_ref().map(Calculators::for_engine).unwrap_or_default();
        state.detail_tab = DetailTab::Specs;
        if let Some(engine) = &engine {
            info!("Engine selected: {}", engine.key());
        }
        state.current_engine = engine;
    }

    pub fn begin_analysis(&mut self) -> Result<AdvisoryTicket, AppResponse> {
        let engine = self.state.current_engine.as_ref().ok_or_else(no_engine)?;
        Ok(self.state.advisor.begin_analysis(&self.gateway, engine)?)
    }

    pub fn begin_build_path(&mut self) -> Result<AdvisoryTicket, AppResponse> {
        let engine = self.state.current_engine.as_ref().ok_or_else(no_engine)?;
        self.state.advisor.begin_build_path(&self.gateway, engine).map_err(|e| match e {
            AdvisoryError::InvalidInput(msg) => AppResponse::ValidationError(msg),
            other => other.into(),
        })
    }

    pub fn begin_chat(&mut self, message: &str) -> Result<AdvisoryTicket, AppResponse> {
        let engine = self.state.current_engine.as_ref().ok_or_else(no_engine)?;
        self.state.advisor.begin_chat(&self.gateway, engine, message).map_err(|e| match e {
            AdvisoryError::InvalidInput(msg) => AppResponse::ValidationError(msg),
            other => other.into(),
        })
    }

    /// Delivers the outcome of a request started with one of the `begin_*`
    /// methods. Outcomes for a previously selected engine are ignored.
    pub fn complete_advisory(
        &mut self,
        ticket: AdvisoryTicket,
        outcome: Result<AdvisoryResponse, AdvisoryError>,
    ) -> Result<(), AppResponse> {
        Ok(self.state.advisor.complete(ticket, outcome)?)
    }

    fn run(&mut self, ticket: AdvisoryTicket) -> Result<(), AppResponse> {
        self.state.advisor.run(&self.gateway, ticket).map_err(|e| {
            warn!("Advisor request failed: {e}");
            AppResponse::from(e)
        })
    }

    pub fn snapshot(&self) -> AppSnapshot<'_> {
        let state = &self.state;
        let premium = self.builds.is_premium();
        let make = state.selection.make();
        let model = state.selection.model();

        let models = make.map(|m| self.catalog.models(m)).unwrap_or_default();
        let engine_codes = match (make, model) {
            (Some(make), Some(model)) => self
                .catalog
                .engines_for(make, model)
                .into_iter()
                .map(|e| e.engine_code.clone())
                .collect(),
            _ => Vec::new(),
        };

        let engine = state.current_engine.as_ref();
        let upgrades = engine
            .map(|e| self.catalog.visible_parts(&e.engine_code, premium))
            .unwrap_or_default();
        let proven_configurations = engine
            .map(|e| self.catalog.configurations_for(&e.engine_code))
            .unwrap_or_default();

        AppSnapshot {
            selection: &state.selection,
            makes: self.catalog.makes(),
            models,
            engine_codes,
            current_engine: engine,
            cubic_inches: cubic_inches(engine.and_then(|e| e.displacement)),
            detail_tab: state.detail_tab,
            calculators: &state.calculators,
            compression_ratio: state.calculators.compression_ratio(),
            has_upgrade_data: engine.is_some_and(|e| self.catalog.has_upgrade_data(&e.engine_code)),
            upgrades,
            proven_configurations,
            comparison: state.comparison.engines().iter().map(Engine::key).collect(),
            comparison_rows: state.comparison.rows(),
            builds: self.builds.builds(),
            build_quota: self.builds.quota_usage(),
            premium,
            advisor_available: self.gateway.is_available(),
            advisor: &state.advisor,
        }
    }
}
