use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::RwLock;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ListResourceTemplatesResult, ListResourcesResult,
        PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
        ReadResourceRequestParams, ReadResourceResult, Resource, ResourceContents,
        ResourceTemplate, ServerCapabilities, ServerInfo,
    },
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::controller::booking_form::{BookingForm, FormState, SubmitOutcome};
use crate::domain::date_range::parse_optional_date;
use crate::domain::room::RoomFilter;
use crate::domain::session::{Credentials, Registration, SessionContext};
use crate::error::BookingError;
use crate::ports::clock::Clock;
use crate::ports::hotel_api::HotelApi;

// ---------- Resource Store ----------

/// Thread-safe store of fetched hotel data exposed as MCP resources.
/// Keys are URIs like `hotel://room/r1`, values are text content.
#[derive(Clone, Default)]
pub struct ResourceStore {
    entries: Arc<RwLock<HashMap<String, ResourceEntry>>>,
}

#[derive(Clone)]
struct ResourceEntry {
    name: String,
    text: String,
}

impl ResourceStore {
    async fn insert(&self, uri: impl Into<String>, name: impl Into<String>, text: String) {
        self.entries.write().await.insert(
            uri.into(),
            ResourceEntry {
                name: name.into(),
                text,
            },
        );
    }

    async fn get(&self, uri: &str) -> Option<ResourceEntry> {
        self.entries.read().await.get(uri).cloned()
    }

    async fn list(&self) -> Vec<(String, String)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(uri, entry)| (uri.clone(), entry.name.clone()))
            .collect()
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore").finish()
    }
}

// ---------- Open booking forms ----------

/// One booking form per room, kept open across tool calls.
///
/// A date change takes a ticket as soon as it arrives. Only the holder of the
/// room's newest ticket may write dates, so a call that was slow to open the
/// form cannot overwrite dates chosen by a later call.
#[derive(Clone, Default)]
struct FormRegistry {
    rooms: Arc<Mutex<HashMap<String, RoomSlot>>>,
}

#[derive(Default)]
struct RoomSlot {
    form: Option<Arc<BookingForm>>,
    latest_ticket: u64,
}

fn accepts_changes(form: &BookingForm) -> bool {
    !matches!(form.snapshot().state, FormState::Submitted(_))
}

impl FormRegistry {
    fn slots(&self) -> MutexGuard<'_, HashMap<String, RoomSlot>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, room_id: &str) -> Option<Arc<BookingForm>> {
        self.slots().get(room_id).and_then(|slot| slot.form.clone())
    }

    /// The open form if it can still take new dates.
    fn reusable(&self, room_id: &str) -> Option<Arc<BookingForm>> {
        self.get(room_id).filter(|form| accepts_changes(form))
    }

    fn take_ticket(&self, room_id: &str) -> u64 {
        let mut slots = self.slots();
        let slot = slots.entry(room_id.to_string()).or_default();
        slot.latest_ticket += 1;
        slot.latest_ticket
    }

    fn is_latest(&self, room_id: &str, ticket: u64) -> bool {
        self.slots()
            .get(room_id)
            .is_some_and(|slot| slot.latest_ticket == ticket)
    }

    /// Install `fresh` unless a reusable form was opened meanwhile. Returns the form in use.
    fn install(&self, room_id: &str, fresh: Arc<BookingForm>) -> Arc<BookingForm> {
        let mut slots = self.slots();
        let slot = slots.entry(room_id.to_string()).or_default();
        match &slot.form {
            Some(open) if accepts_changes(open) => Arc::clone(open),
            _ => {
                slot.form = Some(Arc::clone(&fresh));
                fresh
            }
        }
    }
}

impl std::fmt::Debug for FormRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormRegistry").finish()
    }
}

// ---------- Tool parameter types ----------

#[derive(Debug, Default, serde::Deserialize, schemars::JsonSchema)]
pub struct ListRoomsToolParams {
    /// Room type to keep (e.g. "Single", "Double", "Suite"). Case-insensitive.
    pub room_type: Option<String>,
    /// Minimum number of guests the room must hold
    pub min_capacity: Option<u32>,
    /// Maximum nightly price
    pub max_price: Option<f64>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct RoomToolParams {
    /// Room ID (from hotel_list_rooms)
    pub room_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AvailabilityToolParams {
    /// Room ID (from hotel_list_rooms)
    pub room_id: String,
    /// Check-in date (YYYY-MM-DD). Omit to keep the date already on the form.
    pub check_in: Option<String>,
    /// Check-out date (YYYY-MM-DD). Omit to keep the date already on the form.
    pub check_out: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct LoginToolParams {
    /// Account email address
    pub email: String,
    /// Account password
    pub password: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct RegisterToolParams {
    /// Full name
    pub name: String,
    /// Email address used to sign in
    pub email: String,
    /// Password, at least 6 characters
    pub password: String,
}

fn failure(text: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(text)])
}

fn sign_in_hint(reason: &str) -> String {
    format!("Sign-in required: {reason}. Use hotel_login or hotel_register, then try again.")
}

#[derive(Clone)]
pub struct HotelMcpServer {
    api: Arc<dyn HotelApi>,
    session: SessionContext,
    clock: Arc<dyn Clock>,
    tool_router: ToolRouter<Self>,
    resources: ResourceStore,
    forms: FormRegistry,
}

#[tool_router]
impl HotelMcpServer {
    pub fn new(api: Arc<dyn HotelApi>, session: SessionContext, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            session,
            clock,
            tool_router: Self::tool_router(),
            resources: ResourceStore::default(),
            forms: FormRegistry::default(),
        }
    }

    /// The open form for a room, or a fresh one once the previous form has booked.
    async fn open_form(&self, room_id: &str) -> crate::error::Result<Arc<BookingForm>> {
        if let Some(form) = self.forms.reusable(room_id) {
            return Ok(form);
        }
        let room = self.api.get_room(room_id).await?;
        let fresh = Arc::new(BookingForm::new(
            room,
            Arc::clone(&self.api),
            self.session.clone(),
            Arc::clone(&self.clock),
        )?);
        let form = self.forms.install(room_id, Arc::clone(&fresh));
        if Arc::ptr_eq(&form, &fresh) {
            info!(room_id, number = %form.room().number, "Opened booking form");
        }
        Ok(form)
    }

    /// List hotel rooms, optionally filtered by type, capacity and price.
    #[tool(
        name = "hotel_list_rooms",
        description = "List the hotel's rooms with nightly price, capacity and amenities. Optional filters: room type, minimum guest capacity, maximum nightly price. Start here to get room IDs for the other tools.",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    async fn hotel_list_rooms(
        &self,
        Parameters(params): Parameters<ListRoomsToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let filter = RoomFilter {
            room_type: params.room_type,
            min_capacity: params.min_capacity,
            max_price: params.max_price,
        };

        match self.api.list_rooms().await {
            Ok(rooms) => {
                let matching = filter.apply(&rooms);
                let mut text = String::new();
                if matching.is_empty() {
                    text.push_str("No rooms match these filters.\n");
                } else {
                    let _ = writeln!(text, "Found {} rooms:\n", matching.len());
                    for (i, room) in matching.iter().enumerate() {
                        let _ = write!(
                            text,
                            "{}. **Room {}** ({}) ID: {}\n   ${:.2}/night | up to {} guest(s)",
                            i + 1,
                            room.number,
                            room.room_type,
                            room.id,
                            room.nightly_rate,
                            room.capacity,
                        );
                        if !room.amenities.is_empty() {
                            let _ = write!(text, " | {}", room.amenities.join(", "));
                        }
                        if !room.available {
                            text.push_str(" | not accepting bookings");
                        }
                        text.push_str("\n\n");
                    }
                }
                self.resources
                    .insert("hotel://rooms", "Rooms", text.clone())
                    .await;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure(format!(
                "Failed to load rooms: {e}. Check that the hotel API is reachable."
            ))),
        }
    }

    #[tool(
        name = "hotel_room_details",
        description = "Get details for one room: type, number, nightly price, capacity, amenities. Also shows the room's booking form if one is open.",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    async fn hotel_room_details(
        &self,
        Parameters(params): Parameters<RoomToolParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.api.get_room(&params.room_id).await {
            Ok(room) => {
                let mut text = room.to_string();
                self.resources
                    .insert(
                        format!("hotel://room/{}", room.id),
                        format!("Room {}", room.number),
                        text.clone(),
                    )
                    .await;
                if let Some(form) = self.forms.get(&params.room_id) {
                    let _ = write!(text, "\n## Booking form\n{}", form.snapshot());
                }
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure(format!(
                "Failed to get room '{}': {e}. Use hotel_list_rooms to find valid room IDs.",
                params.room_id
            ))),
        }
    }

    /// Set dates on a room's booking form and check availability.
    #[tool(
        name = "hotel_check_availability",
        description = "Set check-in/check-out dates (YYYY-MM-DD) on a room's booking form and check availability. Shows the night count and total price. Omitting both dates re-runs the last check. Call again with new dates to change them.",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    async fn hotel_check_availability(
        &self,
        Parameters(params): Parameters<AvailabilityToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let dates = parse_optional_date(params.check_in.as_deref()).and_then(|check_in| {
            parse_optional_date(params.check_out.as_deref()).map(|check_out| (check_in, check_out))
        });
        let (check_in, check_out) = match dates {
            Ok(dates) => dates,
            Err(e) => return Ok(failure(e.to_string())),
        };

        let ticket = self.forms.take_ticket(&params.room_id);
        let form = match self.open_form(&params.room_id).await {
            Ok(form) => form,
            Err(e) => {
                return Ok(failure(format!(
                    "Cannot open a booking form for room '{}': {e}",
                    params.room_id
                )));
            }
        };
        if !self.forms.is_latest(&params.room_id, ticket) {
            info!(room_id = %params.room_id, ticket, "Date change superseded by a later call");
            return Ok(failure(format!(
                "{}\n\nThese dates were not applied: a later hotel_check_availability call for this room replaced them.",
                form.snapshot()
            )));
        }

        let result = match (check_in, check_out) {
            (Some(_), Some(_)) => form.select_dates(check_in, check_out).await,
            (Some(_), None) => form.select_check_in(check_in).await,
            (None, Some(_)) => form.select_check_out(check_out).await,
            (None, None) => form.recheck().await,
        };

        match result {
            Ok(snapshot) => {
                let text = snapshot.to_string();
                if snapshot.last_error.is_some() {
                    Ok(failure(format!(
                        "{text}\n\nThe availability check failed. Call hotel_check_availability again to retry."
                    )))
                } else {
                    Ok(CallToolResult::success(vec![Content::text(text)]))
                }
            }
            Err(e) => Ok(failure(e.to_string())),
        }
    }

    /// Submit the open booking form for a room.
    #[tool(
        name = "hotel_book",
        description = "Book a room using the dates on its booking form. Requires a successful hotel_check_availability showing the room as available and a signed-in user. Never retried automatically: on failure, call again to retry.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = false, open_world_hint = true)
    )]
    async fn hotel_book(
        &self,
        Parameters(params): Parameters<RoomToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let Some(form) = self.forms.get(&params.room_id) else {
            return Ok(failure(format!(
                "No booking form is open for room '{}'. Use hotel_check_availability first.",
                params.room_id
            )));
        };

        match form.submit().await {
            SubmitOutcome::Booked(booking) => Ok(CallToolResult::success(vec![Content::text(
                format!("Booking submitted.\n\n{booking}"),
            )])),
            SubmitOutcome::SignInRequired(reason) => Ok(failure(sign_in_hint(&reason))),
            SubmitOutcome::NotReady(state) => Ok(failure(format!(
                "Booking is not possible right now ({state}). Check availability for valid dates first."
            ))),
            SubmitOutcome::InvalidDates(problem) => Ok(failure(format!(
                "The dates on the form are no longer valid: {problem}"
            ))),
            SubmitOutcome::Failed(e) => Ok(failure(format!(
                "Booking failed: {e}. You can call hotel_book again to retry."
            ))),
        }
    }

    #[tool(
        name = "hotel_booking_status",
        description = "Show the state of a room's booking form: selected dates, availability, price, and whether booking is enabled.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn hotel_booking_status(
        &self,
        Parameters(params): Parameters<RoomToolParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.forms.get(&params.room_id) {
            Some(form) => Ok(CallToolResult::success(vec![Content::text(
                form.snapshot().to_string(),
            )])),
            None => Ok(failure(format!(
                "No booking form is open for room '{}'. Use hotel_check_availability to open one.",
                params.room_id
            ))),
        }
    }

    #[tool(
        name = "hotel_register",
        description = "Create an account (name, email, password of at least 6 characters) and sign in.",
        annotations(read_only_hint = false, open_world_hint = true)
    )]
    async fn hotel_register(
        &self,
        Parameters(params): Parameters<RegisterToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let registration = Registration {
            name: params.name,
            email: params.email.trim().to_string(),
            password: params.password,
        };
        if let Err(e) = registration.validate() {
            return Ok(failure(e.to_string()));
        }
        match self.api.register(&registration).await {
            Ok(session) => {
                let text = format!(
                    "Registered and signed in as {} <{}>.",
                    session.user.name, session.user.email
                );
                self.session.start(session);
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure(format!("Registration failed: {e}"))),
        }
    }

    #[tool(
        name = "hotel_login",
        description = "Sign in with email and password. Required before booking, listing your bookings or saving favorites.",
        annotations(read_only_hint = false, open_world_hint = true)
    )]
    async fn hotel_login(
        &self,
        Parameters(params): Parameters<LoginToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = Credentials {
            email: params.email.trim().to_string(),
            password: params.password,
        };
        if let Err(e) = credentials.validate() {
            return Ok(failure(e.to_string()));
        }
        match self.api.login(&credentials).await {
            Ok(session) => {
                let mut text = format!("Signed in as {}", session.user.email);
                if !session.user.name.is_empty() {
                    let _ = write!(text, " ({})", session.user.name);
                }
                text.push('.');
                self.session.start(session);
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure(format!("Login failed: {e}"))),
        }
    }

    #[tool(
        name = "hotel_logout",
        description = "Sign out of the current account.",
        annotations(read_only_hint = false, open_world_hint = false)
    )]
    async fn hotel_logout(&self) -> Result<CallToolResult, McpError> {
        let text = if self.session.current().is_some() {
            self.session.clear();
            "Signed out."
        } else {
            "No one is signed in."
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        name = "hotel_my_bookings",
        description = "List the signed-in user's bookings with dates, nights, total price and status.",
        annotations(read_only_hint = true, open_world_hint = true)
    )]
    async fn hotel_my_bookings(&self) -> Result<CallToolResult, McpError> {
        let session = match self.session.active(self.clock.now()) {
            Ok(session) => session,
            Err(e) => return Ok(failure(sign_in_hint(&e.to_string()))),
        };
        match self.api.list_user_bookings(&session).await {
            Ok(bookings) => {
                let mut text = String::new();
                if bookings.is_empty() {
                    text.push_str("You have no bookings yet.\n");
                } else {
                    let _ = writeln!(text, "You have {} booking(s):\n", bookings.len());
                    for booking in &bookings {
                        let _ = writeln!(text, "{booking}\n");
                    }
                }
                self.resources
                    .insert("hotel://bookings", "My bookings", text.clone())
                    .await;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) if e.requires_sign_in() => Ok(failure(sign_in_hint(&e.to_string()))),
            Err(e) => Ok(failure(format!("Failed to load your bookings: {e}"))),
        }
    }

    #[tool(
        name = "hotel_save_favorite",
        description = "Save a room to the signed-in user's favorites.",
        annotations(read_only_hint = false, idempotent_hint = true, open_world_hint = true)
    )]
    async fn hotel_save_favorite(
        &self,
        Parameters(params): Parameters<RoomToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let session = match self.session.active(self.clock.now()) {
            Ok(session) => session,
            Err(e) => return Ok(failure(sign_in_hint(&e.to_string()))),
        };
        match self.api.save_favorite(&session, &params.room_id).await {
            Ok(()) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Room '{}' saved to your favorites.",
                params.room_id
            ))])),
            Err(BookingError::Unauthorized { reason }) => Ok(failure(sign_in_hint(&reason))),
            Err(e) => Ok(failure(format!("Failed to save favorite: {e}"))),
        }
    }
}

#[tool_handler]
impl ServerHandler for HotelMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Hotel booking MCP server: browse rooms, check availability and book.\n\
                 \n\
                 ## Browsing\n\
                 - hotel_list_rooms: all rooms with price, capacity and amenities (filter by type, capacity, max price)\n\
                 - hotel_room_details: one room in full\n\
                 \n\
                 ## Booking flow\n\
                 1. hotel_check_availability with a room ID and check-in/check-out dates (YYYY-MM-DD). \
                 It validates the dates, shows nights and total price, and asks the hotel whether the room is free.\n\
                 2. hotel_login or hotel_register if nobody is signed in.\n\
                 3. hotel_book submits the form. It is only enabled once the room is known to be available.\n\
                 - hotel_booking_status shows the form at any time.\n\
                 \n\
                 ## Account\n\
                 - hotel_my_bookings: your bookings and their status\n\
                 - hotel_save_favorite: remember a room\n\
                 - hotel_logout: sign out\n\
                 \n\
                 ## Resources\n\
                 The last room list, room details and booking list are kept as resources \
                 (hotel://rooms, hotel://room/{id}, hotel://bookings)."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let entries = self.resources.list().await;
        let resources: Vec<Resource> = entries
            .into_iter()
            .map(|(uri, name)| Resource {
                annotations: None,
                raw: RawResource {
                    uri,
                    name,
                    title: None,
                    description: None,
                    mime_type: Some("text/plain".into()),
                    size: None,
                    icons: None,
                    meta: None,
                },
            })
            .collect();
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let templates = vec![ResourceTemplate {
            annotations: None,
            raw: RawResourceTemplate {
                uri_template: "hotel://room/{id}".into(),
                name: "Hotel Room".into(),
                title: Some("Room details".into()),
                description: Some("Room details (fetched via hotel_room_details)".into()),
                mime_type: Some("text/plain".into()),
                icons: None,
            },
        }];
        Ok(ListResourceTemplatesResult {
            resource_templates: templates,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match self.resources.get(&request.uri).await {
            Some(entry) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(entry.text, request.uri)],
            }),
            None => Err(McpError::resource_not_found(
                format!("resource not found: {}", request.uri),
                None,
            )),
        }
    }
}
