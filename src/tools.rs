use serde::Serialize;

/// Which assistant page a form belongs to. Both talk to the same gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantKind {
    Chat,
    Code,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AssistantPage {
    pub title: &'static str,
    pub description: &'static str,
    pub placeholder: &'static str,
    pub href: &'static str,
    pub color: &'static str,
}

impl AssistantKind {
    pub fn page(&self) -> AssistantPage {
        match self {
            AssistantKind::Chat => AssistantPage {
                title: "Nest Chat",
                description: "Powered by advanced AI technology for conversations.",
                placeholder: "Can you explain the basics of machine learning?",
                href: "/chat",
                color: "indigo",
            },
            AssistantKind::Code => AssistantPage {
                title: "Code Builder",
                description: "Build and refine your code effortlessly with Nest AI.",
                placeholder: "How do I write a Python function to sort a list?",
                href: "/code",
                color: "emerald",
            },
        }
    }
}

/// A card on the dashboard.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Tool {
    pub label: &'static str,
    pub href: &'static str,
    pub color: &'static str,
    /// Placeholder tools render a "coming soon" page.
    pub available: bool,
}

pub const TOOLS: &[Tool] = &[
    Tool { label: "Conversation", href: "/chat", color: "indigo", available: true },
    Tool { label: "Image Generation", href: "/image", color: "purple", available: false },
    Tool { label: "Video Generation", href: "/video", color: "orange", available: false },
    Tool { label: "Music Generation", href: "/music", color: "cyan", available: false },
    Tool { label: "Code Generation", href: "/code", color: "emerald", available: true },
];

/// A sidebar link.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NavRoute {
    pub label: &'static str,
    pub href: &'static str,
    pub color: &'static str,
}

pub const NAV_ROUTES: &[NavRoute] = &[
    NavRoute { label: "Dashboard", href: "/dashboard", color: "sky" },
    NavRoute { label: "Nest Chat", href: "/chat", color: "indigo" },
    NavRoute { label: "Code Builder", href: "/code", color: "emerald" },
];

pub fn placeholder_tool(href: &str) -> Option<&'static Tool> {
    TOOLS.iter().find(|t| !t.available && t.href == href)
}
