use crate::models::{Role, Service, Testimonial, User};
use chrono::Utc;

// First-run defaults for local mode. The public site renders these until an
// administrator replaces them, so a fresh install is never empty.

pub fn default_services() -> Vec<Service> {
    let now = Utc::now();
    vec![
        Service {
            id: "1".to_string(),
            title: "Personal Training".to_string(),
            price: "$80/session".to_string(),
            description: "One-on-one personalized training sessions tailored to your specific goals and fitness level.".to_string(),
            features: vec![
                "Customized workout plans".to_string(),
                "Form correction & technique".to_string(),
                "Progress tracking".to_string(),
                "Flexible scheduling".to_string(),
                "Nutritional guidance".to_string(),
            ],
            icon: "User".to_string(),
            popular: true,
            active: true,
            created_at: now,
            updated_at: now,
        },
        Service {
            id: "2".to_string(),
            title: "Small Group Training".to_string(),
            price: "$45/session".to_string(),
            description: "Train with 2-4 people in a motivating group environment while receiving personalized attention.".to_string(),
            features: vec![
                "Groups of 2-4 people".to_string(),
                "Cost-effective training".to_string(),
                "Social motivation".to_string(),
                "Varied workout styles".to_string(),
                "Team building".to_string(),
            ],
            icon: "Users".to_string(),
            popular: false,
            active: true,
            created_at: now,
            updated_at: now,
        },
        Service {
            id: "3".to_string(),
            title: "Virtual Training".to_string(),
            price: "$60/session".to_string(),
            description: "Get professional training from anywhere with live virtual sessions via video call.".to_string(),
            features: vec![
                "Train from home".to_string(),
                "Live video sessions".to_string(),
                "Equipment adaptations".to_string(),
                "Digital workout plans".to_string(),
                "Progress monitoring".to_string(),
            ],
            icon: "Video".to_string(),
            popular: false,
            active: true,
            created_at: now,
            updated_at: now,
        },
        Service {
            id: "4".to_string(),
            title: "Nutrition Coaching".to_string(),
            price: "$120/month".to_string(),
            description: "Comprehensive nutrition guidance to complement your training and accelerate results.".to_string(),
            features: vec![
                "Personalized meal plans".to_string(),
                "Macro tracking guidance".to_string(),
                "Supplement recommendations".to_string(),
                "Weekly check-ins".to_string(),
                "Recipe suggestions".to_string(),
            ],
            icon: "Utensils".to_string(),
            popular: false,
            active: true,
            created_at: now,
            updated_at: now,
        },
    ]
}

pub fn default_testimonials() -> Vec<Testimonial> {
    let now = Utc::now();
    vec![
        Testimonial {
            id: "1".to_string(),
            name: "Sarah Chen".to_string(),
            title: "Marketing Manager".to_string(),
            image: "https://images.pexels.com/photos/1239291/pexels-photo-1239291.jpeg?auto=compress&cs=tinysrgb&w=400".to_string(),
            video_thumb: "https://images.pexels.com/photos/4761792/pexels-photo-4761792.jpeg?auto=compress&cs=tinysrgb&w=600".to_string(),
            video_url: None,
            quote: "Lost 30 pounds in 4 months while building the strongest I've ever been. Alex's approach is sustainable and actually enjoyable!".to_string(),
            rating: 5,
            results: "Lost 30 lbs | Gained Confidence".to_string(),
            featured: true,
            active: true,
            created_at: now,
            updated_at: now,
        },
        Testimonial {
            id: "2".to_string(),
            name: "Michael Rodriguez".to_string(),
            title: "Software Engineer".to_string(),
            image: "https://images.pexels.com/photos/1681010/pexels-photo-1681010.jpeg?auto=compress&cs=tinysrgb&w=400".to_string(),
            video_thumb: "https://images.pexels.com/photos/1552106/pexels-photo-1552106.jpeg?auto=compress&cs=tinysrgb&w=600".to_string(),
            video_url: None,
            quote: "As a busy dad, I thought I'd never find time for fitness. Alex helped me create a routine that works with my schedule.".to_string(),
            rating: 5,
            results: "Built Muscle | Better Energy".to_string(),
            featured: false,
            active: true,
            created_at: now,
            updated_at: now,
        },
        Testimonial {
            id: "3".to_string(),
            name: "Jessica Thompson".to_string(),
            title: "Teacher".to_string(),
            image: "https://images.pexels.com/photos/1181686/pexels-photo-1181686.jpeg?auto=compress&cs=tinysrgb&w=400".to_string(),
            video_thumb: "https://images.pexels.com/photos/4058316/pexels-photo-4058316.jpeg?auto=compress&cs=tinysrgb&w=600".to_string(),
            video_url: None,
            quote: "After my injury, I was afraid to exercise. Alex guided me back to full strength safely and confidently.".to_string(),
            rating: 5,
            results: "Injury Recovery | Strength Gained".to_string(),
            featured: false,
            active: true,
            created_at: now,
            updated_at: now,
        },
    ]
}

/// The site owner's account; exists on every fresh install so the admin
/// panel is reachable before any registration.
pub fn default_admin_user() -> User {
    let now = Utc::now();
    User {
        id: "1".to_string(),
        email: "ari@aridevillefitness.com".to_string(),
        name: "Ari Deville".to_string(),
        role: Role::Admin,
        avatar: Some(
            "https://images.pexels.com/photos/1552252/pexels-photo-1552252.jpeg?auto=compress&cs=tinysrgb&w=400"
                .to_string(),
        ),
        active: true,
        created_at: now,
        updated_at: now,
        last_login_at: None,
        password_hash: None,
    }
}
