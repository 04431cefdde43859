//! Blog explorer: a fixed catalog of posts filtered by category

use serde::Serialize;

pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlogPost {
    pub title: &'static str,
    pub link: &'static str,
    pub category: &'static str,
}

pub const BLOG_POSTS: [BlogPost; 5] = [
    BlogPost {
        title: "Why the World’s Top Tech Companies Use Linux",
        link: "https://www.linkedin.com/posts/nitin-singh-tanwar-133419371_title-why-the-worlds-top-tech-companies-activity-7348600415724163072-4u7q",
        category: "Linux",
    },
    BlogPost {
        title: "5 GUI Programs in Linux and the Commands Behind Them",
        link: "https://www.linkedin.com/posts/nitin-singh-tanwar-133419371_5-gui-programs-in-linux-and-the-commands-activity-7348607634125619201-BzK1",
        category: "Linux",
    },
    BlogPost {
        title: "Case Study: Why Companies Use Docker",
        link: "https://www.linkedin.com/posts/nitin-singh-tanwar-133419371_docker-in-the-real-world-case-studies-activity-7348627852080185344-uGzJ",
        category: "Docker",
    },
    BlogPost {
        title: "AWS Case Studies: How Big Brands Use the Cloud",
        link: "https://www.linkedin.com/posts/nitin-singh-tanwar-133419371_aws-case-studies-how-leading-companies-activity-7351824573782294529-jE1D",
        category: "AWS",
    },
    BlogPost {
        title: "Kubernetes Case Study: How Amazon Uses It",
        link: "https://www.linkedin.com/posts/nitin-singh-tanwar-133419371_case-study-amazons-strategic-use-of-kubernetes-activity-7351081767530868737-tVok",
        category: "Kubernetes",
    },
];

/// `"All"` followed by the distinct categories in sorted order
pub fn categories() -> Vec<&'static str> {
    let mut distinct: Vec<&'static str> = BLOG_POSTS.iter().map(|p| p.category).collect();
    distinct.sort_unstable();
    distinct.dedup();

    let mut categories = vec![ALL_CATEGORIES];
    categories.extend(distinct);
    categories
}

/// Posts in `category`; `None` or `"All"` returns every post
pub fn posts(category: Option<&str>) -> Vec<BlogPost> {
    match category {
        None | Some(ALL_CATEGORIES) => BLOG_POSTS.to_vec(),
        Some(category) => BLOG_POSTS
            .iter()
            .filter(|p| p.category == category)
            .copied()
            .collect(),
    }
}
