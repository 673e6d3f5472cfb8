//! Canned chatbot replies
//!
//! Reply texts are returned to the widget verbatim, markdown included.
//! Only the contact reply depends on configuration.

use super::site::CompanyInfo;

/// Built-in replies that don't depend on configuration
pub mod builtin {
    pub const GREETING: &str = "Hello! Welcome to Kaffero. I'm here to help you learn about our cafe management system. You can ask me about features, pricing, demo, or anything else!";

    pub const PRICING: &str = "Our pricing is simple and transparent:\n\n• **Starter**: ₹35,000 (1 outlet, 5 tables, 3 users)\n• **Standard**: ₹65,000 (3 outlets, 20 tables, 10 users) - Most Popular!\n• **Premium**: ₹95,000 (Unlimited everything)\n\nAll plans include **1 year free support**! After that, annual renewal is 20% of license + actual server/domain charges. Would you like a free demo?";

    pub const DEMO: &str = "We offer a **free 7-day demo** personalized with your cafe name! You'll get access to:\n\n• Admin Dashboard\n• Waiter App (Android)\n• Kitchen Display\n• QR Menu\n\nWould you like to request a demo? Just click the 'Get Started' button or tell me your cafe name!";

    pub const FEATURES: &str = "Kaffero is packed with features:\n\n• **Smart Orders** - Dine-in, takeaway, delivery\n• **Table Management** - Visual floor map with QR codes\n• **Kitchen Display** - Real-time orders, no paper!\n• **Waiter App** - Android app, works offline\n• **QR Ordering** - Customers scan and order\n• **Reports** - Sales, inventory, staff tracking\n\nWhich feature would you like to know more about?";

    pub const QR_ORDERING: &str = "With **QR Ordering**, your customers can:\n\n1. Scan the QR code on their table\n2. Browse your beautiful digital menu\n3. Place orders directly from their phone\n4. No app download needed!\n\nThis reduces wait times and frees up your staff. Would you like a demo?";

    pub const KITCHEN_DISPLAY: &str = "The **Kitchen Display System (KDS)** shows orders in real-time:\n\n• No more paper KOTs\n• Color-coded urgency\n• Order timers\n• Audio alerts\n• One-tap order bumping\n\nYour kitchen staff will love it!";

    pub const SUPPORT: &str = "We provide excellent support:\n\n• **Starter**: 6 months support\n• **Standard**: 1 year priority support\n• **Premium**: 2 years + on-site setup\n\nYou can reach us via WhatsApp, email, or phone. Our team typically responds within 2-4 hours!";

    pub const CAFE_NAME: &str = "Great! I'd love to hear more about your cafe. What's your cafe name and city? This helps us personalize your demo experience!";

    pub const THANKS: &str = "You're welcome! Is there anything else you'd like to know about Kaffero? I'm happy to help!";

    pub const GOODBYE: &str = "Goodbye! Feel free to come back anytime. If you want to request a demo, just click the 'Get Started' button. Have a great day! ☕";

    /// Sent when nothing else matches
    pub const DEFAULT: &str = "Thanks for your message! I can help you with:\n\n• **Pricing** - Our plans and costs\n• **Features** - What Kaffero can do\n• **Demo** - Free trial information\n• **Support** - How we help you\n\nWhat would you like to know more about?";
}

/// Reply for "how do I reach you" questions
pub fn contact(company: &CompanyInfo) -> String {
    format!(
        "You can reach us at:\n\n📞 Phone: {}\n💬 WhatsApp: {}\n📧 Email: {}\n\nWe typically respond within 2-4 hours during business hours!",
        company.phone, company.whatsapp, company.email
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_reply_uses_company_details() {
        let company = CompanyInfo {
            email: "sales@kaffero.in".into(),
            phone: "+91 90000 11111".into(),
            whatsapp: "+91 90000 22222".into(),
        };

        let reply = contact(&company);
        assert!(reply.contains("📞 Phone: +91 90000 11111"));
        assert!(reply.contains("💬 WhatsApp: +91 90000 22222"));
        assert!(reply.contains("📧 Email: sales@kaffero.in"));
    }

    #[test]
    fn test_default_lists_topics() {
        for topic in ["Pricing", "Features", "Demo", "Support"] {
            assert!(builtin::DEFAULT.contains(topic));
        }
    }
}
